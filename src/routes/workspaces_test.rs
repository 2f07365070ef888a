use super::*;
use crate::routes::app;
use crate::services::workspace::{AnalyzeFailure, GENERIC_FAILURE_MESSAGE};
use crate::state::test_helpers::{MockLlm, sample_payload, test_app_state};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::Request;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec(), headers)
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body, _) = send(app, req).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &Router) -> Uuid {
    let (status, body) = send_json(app, empty_request("POST", "/api/workspaces")).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_value(body["id"].clone()).unwrap()
}

fn app_with(llm: MockLlm) -> (Router, Arc<MockLlm>) {
    let llm = Arc::new(llm);
    (app(test_app_state(Arc::clone(&llm))), llm)
}

// =============================================================================
// analyze_status_code
// =============================================================================

#[test]
fn status_codes_by_outcome() {
    assert_eq!(analyze_status_code(&AnalyzeStatus::Completed), StatusCode::OK);
    assert_eq!(
        analyze_status_code(&AnalyzeStatus::Rejected(AnalyzeRejection::NoCode)),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        analyze_status_code(&AnalyzeStatus::Rejected(AnalyzeRejection::NoGoal)),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        analyze_status_code(&AnalyzeStatus::Rejected(AnalyzeRejection::InProgress)),
        StatusCode::CONFLICT
    );
    assert_eq!(
        analyze_status_code(&AnalyzeStatus::Failed(AnalyzeFailure::Aborted)),
        StatusCode::BAD_GATEWAY
    );
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn create_get_delete_roundtrip() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;

    let (status, view) = send_json(&app, empty_request("GET", &format!("/api/workspaces/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["draft"]["goal"], "Make it more modern and improve accessibility.");
    assert_eq!(view["loading"], false);

    let (status, _, _) = send(&app, empty_request("DELETE", &format!("/api/workspaces/{id}"))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send_json(&app, empty_request("GET", &format!("/api/workspaces/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E_WORKSPACE_NOT_FOUND");
}

#[tokio::test]
async fn patch_draft_updates_fields() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    let (status, view) = send_json(
        &app,
        json_request("PATCH", &format!("/api/workspaces/{id}/draft"), &json!({ "css": "p{}", "goal": "Faster" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["draft"]["css"], "p{}");
    assert_eq!(view["draft"]["goal"], "Faster");
    assert_eq!(view["draft"]["html"], "");
}

#[tokio::test]
async fn stale_patch_does_not_overwrite_newer_edit() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    let uri = format!("/api/workspaces/{id}/draft");
    send_json(&app, json_request("PATCH", &uri, &json!({ "html": "abc", "seq": 3 }))).await;

    let (status, view) = send_json(&app, json_request("PATCH", &uri, &json!({ "html": "ab", "seq": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["draft"]["html"], "abc");
}

#[tokio::test]
async fn put_tab_switches_panel() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    let (status, view) =
        send_json(&app, json_request("PUT", &format!("/api/workspaces/{id}/tab"), &json!({ "tab": "preview" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["active_tab"], "preview");
}

// =============================================================================
// Analyze
// =============================================================================

#[tokio::test]
async fn analyze_without_code_is_unprocessable() {
    let (app, llm) = app_with(MockLlm::replying(&sample_payload()));
    let id = create(&app).await;
    let (status, view) = send_json(&app, empty_request("POST", &format!("/api/workspaces/{id}/analyze"))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(view["error"], "Please provide some code to analyze.");
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn analyze_success_returns_result_and_fragment() {
    let (app, llm) = app_with(MockLlm::replying(&sample_payload()));
    let id = create(&app).await;
    send_json(&app, json_request("PATCH", &format!("/api/workspaces/{id}/draft"), &json!({ "html": "<img>" }))).await;

    let (status, view) = send_json(&app, empty_request("POST", &format!("/api/workspaces/{id}/analyze"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(llm.calls(), 1);
    assert_eq!(view["loading"], false);
    assert!(view["error"].is_null());
    assert_eq!(view["result"]["accessibility"][0]["codeSnippet"], "<img alt=\"Logo\">");

    let (status, body, _) = send(&app, empty_request("GET", &format!("/api/workspaces/{id}/suggestions"))).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("Accessibility"));
    assert!(!html.contains("Performance"));
}

#[tokio::test]
async fn analyze_bad_payload_is_bad_gateway_with_generic_message() {
    let (app, _) = app_with(MockLlm::replying("not json at all"));
    let id = create(&app).await;
    send_json(&app, json_request("PATCH", &format!("/api/workspaces/{id}/draft"), &json!({ "js": "1;" }))).await;

    let (status, view) = send_json(&app, empty_request("POST", &format!("/api/workspaces/{id}/analyze"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(view["error"], GENERIC_FAILURE_MESSAGE);
    assert_eq!(view["loading"], false);
    assert!(view["result"].is_null());
}

#[tokio::test]
async fn analyze_unknown_workspace_is_not_found() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let (status, body) =
        send_json(&app, empty_request("POST", &format!("/api/workspaces/{}/analyze", Uuid::new_v4()))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E_WORKSPACE_NOT_FOUND");
}

// =============================================================================
// Categories
// =============================================================================

#[tokio::test]
async fn toggle_category_flips_expanded_flag() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    let uri = format!("/api/workspaces/{id}/categories/ui_ux/toggle");

    let (status, body) = send_json(&app, empty_request("POST", &uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["category"], "ui_ux");
    assert_eq!(body["expanded"], false);

    let (_, body) = send_json(&app, empty_request("POST", &uri)).await;
    assert_eq!(body["expanded"], true);
}

#[tokio::test]
async fn toggle_unknown_category_is_not_found() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    let (status, body) =
        send_json(&app, empty_request("POST", &format!("/api/workspaces/{id}/categories/seo/toggle"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "E_UNKNOWN_CATEGORY");
}

// =============================================================================
// Preview
// =============================================================================

#[tokio::test]
async fn preview_page_is_sandboxed_placeholder_when_empty() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    let (status, body, headers) = send(&app, empty_request("GET", &format!("/api/workspaces/{id}/preview"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_SECURITY_POLICY], SANDBOX_CSP);
    assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert!(!String::from_utf8(body).unwrap().contains("<script"));
}

#[tokio::test(start_paused = true)]
async fn preview_follows_debounced_edits() {
    let (app, _) = app_with(MockLlm::replying("{}"));
    let id = create(&app).await;
    send_json(
        &app,
        json_request("PATCH", &format!("/api/workspaces/{id}/draft"), &json!({ "html": "<h1>Hi</h1>" })),
    )
    .await;

    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/workspaces/{id}/preview/embed"))).await;
    assert!(!String::from_utf8(body).unwrap().contains("<iframe"));

    tokio::time::sleep(std::time::Duration::from_millis(600)).await;

    let (_, body, _) = send(&app, empty_request("GET", &format!("/api/workspaces/{id}/preview/embed"))).await;
    let embed = String::from_utf8(body).unwrap();
    assert!(embed.contains("<iframe"));
    assert!(embed.contains("sandbox=\"allow-scripts\""));
    assert!(embed.contains("&lt;h1&gt;Hi&lt;/h1&gt;"));
}
