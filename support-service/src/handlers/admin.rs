use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{EscalatedSessionResponse, EscalatedSessionsResponse};
use crate::models::SupportStats;
use crate::startup::AppState;

pub async fn stats(State(state): State<AppState>) -> Result<Json<SupportStats>, AppError> {
    Ok(Json(state.support.stats().await?))
}

pub async fn escalated_sessions(
    State(state): State<AppState>,
) -> Result<Json<EscalatedSessionsResponse>, AppError> {
    let sessions = state.support.escalated_sessions().await?;
    Ok(Json(EscalatedSessionsResponse {
        escalated_sessions: sessions
            .into_iter()
            .map(EscalatedSessionResponse::from)
            .collect(),
    }))
}
