//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the shell page, the health check and the workspace API under a
//! single Axum router. The shell is a static page compiled into the binary;
//! everything it shows comes from the JSON and HTML-fragment endpoints.

pub mod workspaces;

use axum::Router;
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/api/workspaces", post(workspaces::create_workspace))
        .route(
            "/api/workspaces/{id}",
            get(workspaces::get_workspace).delete(workspaces::delete_workspace),
        )
        .route("/api/workspaces/{id}/draft", patch(workspaces::update_draft))
        .route("/api/workspaces/{id}/tab", put(workspaces::set_tab))
        .route("/api/workspaces/{id}/analyze", post(workspaces::analyze))
        .route(
            "/api/workspaces/{id}/categories/{category}/toggle",
            post(workspaces::toggle_category),
        )
        .route("/api/workspaces/{id}/suggestions", get(workspaces::suggestions_fragment))
        .route("/api/workspaces/{id}/preview", get(workspaces::preview_page))
        .route("/api/workspaces/{id}/preview/embed", get(workspaces::preview_embed))
        .route("/api/workspaces/{id}/preview/events", get(workspaces::preview_events))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
