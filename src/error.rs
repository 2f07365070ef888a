//! Error codes and the JSON error body returned by HTTP routes.
//!
//! Every domain error implements [`ErrorCode`] so routes can report a stable
//! machine-readable code next to the human message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Stable error code + retry hint for a domain error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// JSON error body: `{ "code": "...", "message": "...", "retryable": false }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ErrorBody {
    #[must_use]
    pub fn from_error(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self { code: err.error_code().to_string(), message: err.to_string(), retryable: err.retryable() }
    }
}

/// Route-level failure: an HTTP status plus an [`ErrorBody`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, err: &(impl ErrorCode + ?Sized)) -> Self {
        Self { status, body: ErrorBody::from_error(err) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
