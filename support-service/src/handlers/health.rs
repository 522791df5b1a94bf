use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

/// Liveness check; reports the store connection state.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.support.store().health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "support-service",
                "version": env!("CARGO_PKG_VERSION"),
                "model": state.support.gateway().model()
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Store health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "support-service",
                    "error": "store unavailable"
                })),
            )
        }
    }
}

/// Readiness check: the store answers, the FAQ cache is loaded and the model
/// provider is reachable.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.support.store().health_check().await {
        tracing::warn!(error = %e, "Not ready: store unavailable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if state.support.faqs().is_empty() {
        tracing::warn!("Not ready: FAQ cache is empty");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    if let Err(e) = state.support.gateway().health_check().await {
        tracing::warn!(error = %e, "Not ready: model provider unavailable");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}
