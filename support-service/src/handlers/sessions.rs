use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;

use crate::dtos::{
    EndSessionResponse, EscalateRequest, EscalateResponse, HistoryQuery, HistoryResponse,
    StartSessionRequest, StartSessionResponse, SummaryResponse, TurnResponse,
};
use crate::models::NewSession;
use crate::startup::AppState;
use crate::utils::{parse_id, QueryParams, ValidatedJson};

pub async fn start_session(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, AppError> {
    let session = state
        .support
        .start_session(NewSession {
            customer_name: req.customer_name,
            customer_email: req.customer_email,
        })
        .await?;

    Ok(Json(StartSessionResponse {
        session_id: session.session_id,
        message: "Session started successfully".to_string(),
    }))
}

pub async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    QueryParams(query): QueryParams<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let session_id = parse_id(&session_id, "session")?;
    if matches!(query.limit, Some(l) if l < 1) {
        return Err(AppError::bad_request("limit must be at least 1"));
    }

    let turns = state
        .support
        .history(session_id, query.limit, query.history_order())
        .await?;

    Ok(Json(HistoryResponse {
        session_id,
        history: turns.into_iter().map(TurnResponse::from).collect(),
    }))
}

pub async fn escalate_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(req): ValidatedJson<EscalateRequest>,
) -> Result<Json<EscalateResponse>, AppError> {
    let session_id = parse_id(&session_id, "session")?;
    let outcome = state
        .support
        .escalate_manually(session_id, &req.reason)
        .await?;

    let message = if outcome.status_changed {
        "Session escalated successfully"
    } else {
        "Escalation recorded"
    };

    Ok(Json(EscalateResponse {
        message: message.to_string(),
        session_id,
        status: outcome.session.status,
    }))
}

pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<EndSessionResponse>, AppError> {
    let session_id = parse_id(&session_id, "session")?;
    let session = state.support.end_session(session_id).await?;
    Ok(Json(EndSessionResponse::from(session)))
}

pub async fn get_summary(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SummaryResponse>, AppError> {
    let session_id = parse_id(&session_id, "session")?;
    let summary = state.support.summary(session_id).await?;
    Ok(Json(SummaryResponse { summary }))
}
