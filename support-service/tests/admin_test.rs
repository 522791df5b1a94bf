//! Admin, health and middleware integration tests.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::TestApp;
use serde_json::json;
use support_service::services::providers::{MockTextProvider, ProviderError};
use tower::util::ServiceExt;

#[tokio::test]
async fn stats_count_sessions_turns_and_escalations() {
    let app = TestApp::spawn().await;
    let calm = app.start_session().await;
    let upset = app.start_session().await;
    let done = app.start_session().await;

    app.chat(calm, "How can I track my order?").await;
    app.chat(upset, "I am angry, get me a manager").await;
    app.chat(done, "What is your return policy?").await;
    app.post_json(&format!("/api/sessions/{}/end", done), json!({}))
        .await;

    let (status, body) = app.get("/api/admin/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_sessions"], 3);
    assert_eq!(body["active_sessions"], 1);
    assert_eq!(body["escalated_sessions"], 1);
    assert_eq!(body["ended_sessions"], 1);
    assert_eq!(body["total_turns"], 3);
    assert_eq!(body["total_escalations"], 1);
}

#[tokio::test]
async fn escalated_sessions_lists_reason_and_customer() {
    let app = TestApp::spawn().await;
    let session_id = app.start_session().await;
    app.start_session().await;

    app.post_json(
        &format!("/api/sessions/{}/escalate", session_id),
        json!({ "reason": "Wants to speak to billing" }),
    )
    .await;

    let (status, body) = app.get("/api/admin/escalated").await;

    assert_eq!(status, StatusCode::OK);
    let sessions = body["escalated_sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["session_id"], session_id.to_string());
    assert_eq!(sessions[0]["customer_name"], "Ana");
    assert_eq!(
        sessions[0]["escalation_reason"],
        "Manual escalation: Wants to speak to billing"
    );
    assert_eq!(sessions[0]["resolved"], false);
}

#[tokio::test]
async fn health_and_readiness_checks() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "support-service");
    assert_eq!(body["model"], "mock");

    let (status, _) = app.get("/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn readiness_fails_when_model_provider_is_down() {
    let app = TestApp::with_provider(MockTextProvider::failing(ProviderError::NotConfigured(
        "missing api key".into(),
    )))
    .await;

    let (status, _) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_endpoint_exposes_support_counters() {
    support_service::services::metrics::init_metrics();
    let app = TestApp::spawn().await;
    let session_id = app.start_session().await;
    app.chat(session_id, "How do I reset my password?").await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("support_chat_messages_total"), "{}", text);
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.get("x-frame-options").is_some());
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/api/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
