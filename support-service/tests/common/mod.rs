//! Test helpers for support-service integration tests.
//!
//! Builds the full router over the in-memory store and a scripted provider,
//! and drives it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use support_service::{
    build_router,
    config::LlmConfig,
    services::{
        providers::{MockTextProvider, TextProvider},
        EscalationClassifier, FaqStore, LlmGateway, MemorySupportStore, SupportService,
        SupportStore,
    },
    startup::seed_faqs,
    AppState,
};
use tower::util::ServiceExt;
use uuid::Uuid;

pub fn llm_config() -> LlmConfig {
    LlmConfig {
        api_key: "test-key".to_string(),
        model: "mock".to_string(),
        max_tokens: 1000,
        temperature: 0.7,
        summary_max_tokens: 300,
        summary_temperature: 0.5,
        timeout_secs: 5,
        max_retries: 1,
    }
}

pub struct TestApp {
    pub router: Router,
    pub support: SupportService,
    pub provider: Arc<MockTextProvider>,
}

impl TestApp {
    /// App backed by the echo provider.
    pub async fn spawn() -> Self {
        Self::with_provider(MockTextProvider::echo()).await
    }

    pub async fn with_provider(provider: MockTextProvider) -> Self {
        Self::with_history_limit(provider, 20).await
    }

    pub async fn with_history_limit(provider: MockTextProvider, history_limit: usize) -> Self {
        let provider = Arc::new(provider);
        let dyn_provider: Arc<dyn TextProvider> = provider.clone();
        let store: Arc<dyn SupportStore> = Arc::new(MemorySupportStore::new());

        let support = SupportService::new(
            store,
            FaqStore::new(Vec::new(), 2),
            LlmGateway::new(dyn_provider, llm_config(), history_limit),
            EscalationClassifier::default(),
            history_limit,
        );
        support
            .load_faqs(&seed_faqs().expect("bundled FAQs parse"))
            .await
            .expect("Failed to load FAQs");

        let router = build_router(
            AppState {
                support: support.clone(),
            },
            &["*".to_string()],
            None,
        );

        Self {
            router,
            support,
            provider,
        }
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn start_session(&self) -> Uuid {
        let (status, body) = self
            .post_json(
                "/api/sessions/start",
                serde_json::json!({ "customer_name": "Ana", "customer_email": "ana@example.com" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "start session failed: {}", body);
        body["session_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("session_id in response")
    }

    pub async fn chat(&self, session_id: Uuid, message: &str) -> (StatusCode, Value) {
        self.post_json(
            "/api/chat",
            serde_json::json!({ "session_id": session_id, "message": message }),
        )
        .await
    }
}
