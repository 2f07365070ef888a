//! Workspace routes: draft edits, analyze, view state and the live preview.
//!
//! Every JSON endpoint answers with the full `WorkspaceView` so the shell can
//! re-render from one source of truth. Fragment endpoints return HTML that
//! the shell drops into place as-is.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_SECURITY_POLICY, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Json, Response};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorCode};
use crate::services::advisor::Category;
use crate::services::preview::SANDBOX_CSP;
use crate::services::workspace::{
    self, ActiveTab, AnalyzeRejection, AnalyzeStatus, DraftEdit, WorkspaceView,
};
use crate::state::{AppState, SharedWorkspace};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(Uuid),
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

impl ErrorCode for RouteError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::WorkspaceNotFound(_) => "E_WORKSPACE_NOT_FOUND",
            Self::UnknownCategory(_) => "E_UNKNOWN_CATEGORY",
        }
    }
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, &err)
    }
}

async fn find_workspace(state: &AppState, id: Uuid) -> Result<SharedWorkspace, ApiError> {
    state
        .workspace(id)
        .await
        .ok_or_else(|| RouteError::WorkspaceNotFound(id).into())
}

// =============================================================================
// BODIES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CreatedWorkspace {
    pub id: Uuid,
    pub view: WorkspaceView,
}

#[derive(Debug, Deserialize)]
pub struct SetTabBody {
    pub tab: ActiveTab,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub category: Category,
    pub expanded: bool,
    pub view: WorkspaceView,
}

/// SSE payload announcing that the debounced preview changed.
#[derive(Debug, Serialize)]
pub struct PreviewEvent {
    pub placeholder: bool,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/workspaces`: start a new session.
pub async fn create_workspace(State(state): State<AppState>) -> (StatusCode, Json<CreatedWorkspace>) {
    let (id, ws) = state.create_workspace().await;
    let view = ws.lock().await.view();
    info!(workspace_id = %id, "workspace created");
    (StatusCode::CREATED, Json(CreatedWorkspace { id, view }))
}

/// `GET /api/workspaces/:id`
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceView>, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let view = ws.lock().await.view();
    Ok(Json(view))
}

/// `DELETE /api/workspaces/:id`
pub async fn delete_workspace(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if state.remove_workspace(id).await {
        info!(workspace_id = %id, "workspace deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RouteError::WorkspaceNotFound(id).into())
    }
}

/// `PATCH /api/workspaces/:id/draft`: apply partial edits to code and goal.
pub async fn update_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<DraftEdit>,
) -> Result<Json<WorkspaceView>, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let mut ws = ws.lock().await;
    ws.apply_edit(edit);
    Ok(Json(ws.view()))
}

/// `PUT /api/workspaces/:id/tab`
pub async fn set_tab(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetTabBody>,
) -> Result<Json<WorkspaceView>, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let mut ws = ws.lock().await;
    ws.set_active_tab(body.tab);
    Ok(Json(ws.view()))
}

/// `POST /api/workspaces/:id/analyze`: validate, call the model, store the
/// result. The body is always the resulting view; the status tells the
/// shell which path was taken.
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<WorkspaceView>), ApiError> {
    let ws = find_workspace(&state, id).await?;
    let outcome = workspace::run_analysis(ws, Arc::clone(&state.llm)).await;
    let status = analyze_status_code(&outcome.status);
    if let AnalyzeStatus::Failed(failure) = &outcome.status {
        warn!(
            workspace_id = %id,
            code = failure.error_code(),
            retryable = failure.retryable(),
            "analyze failed"
        );
    }
    Ok((status, Json(outcome.view)))
}

pub(crate) fn analyze_status_code(status: &AnalyzeStatus) -> StatusCode {
    match status {
        AnalyzeStatus::Completed => StatusCode::OK,
        AnalyzeStatus::Rejected(AnalyzeRejection::InProgress) => StatusCode::CONFLICT,
        AnalyzeStatus::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalyzeStatus::Failed(_) => StatusCode::BAD_GATEWAY,
    }
}

/// `POST /api/workspaces/:id/categories/:category/toggle`
pub async fn toggle_category(
    State(state): State<AppState>,
    Path((id, key)): Path<(Uuid, String)>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let category = Category::from_key(&key).ok_or(RouteError::UnknownCategory(key))?;
    let ws = find_workspace(&state, id).await?;
    let mut ws = ws.lock().await;
    let expanded = ws.toggle_category(category);
    Ok(Json(ToggleResponse { category, expanded, view: ws.view() }))
}

/// `GET /api/workspaces/:id/suggestions`: rendered suggestions panel.
/// Empty when no analysis has completed.
pub async fn suggestions_fragment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let html = ws.lock().await.suggestions_html().unwrap_or_default();
    Ok(Html(html))
}

/// `GET /api/workspaces/:id/preview`: standalone sandboxed preview page.
pub async fn preview_page(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let page = ws.lock().await.preview_document().to_page();
    Ok((
        [
            (CONTENT_TYPE, "text/html; charset=utf-8"),
            (CONTENT_SECURITY_POLICY, SANDBOX_CSP),
            (X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        page,
    )
        .into_response())
}

/// `GET /api/workspaces/:id/preview/embed`: iframe markup for the shell.
pub async fn preview_embed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let embed = ws.lock().await.preview_document().to_embed();
    Ok(Html(embed))
}

/// `GET /api/workspaces/:id/preview/events`: one `preview` event per
/// debounced update.
pub async fn preview_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let ws = find_workspace(&state, id).await?;
    let rx = ws.lock().await.subscribe_preview();
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let placeholder = rx.borrow_and_update().is_empty();
        let event = Event::default()
            .event("preview")
            .json_data(PreviewEvent { placeholder });
        Some((event, rx))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
#[path = "workspaces_test.rs"]
mod tests;
