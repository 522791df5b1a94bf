use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{ChatRequest, ChatResponse};
use crate::startup::AppState;
use crate::utils::ValidatedJson;

pub async fn chat(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let outcome = state.support.chat(req.session_id, &req.message).await?;
    Ok(Json(ChatResponse::from(outcome)))
}
