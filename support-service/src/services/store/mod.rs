//! Session, conversation, escalation and FAQ persistence.
//!
//! [`PgSupportStore`] is the production backend; [`MemorySupportStore`] keeps
//! everything in process for tests and `DATABASE_URL=memory://` runs.

mod memory;
mod postgres;

pub use memory::MemorySupportStore;
pub use postgres::PgSupportStore;

use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

use crate::models::{
    ConversationTurn, EscalatedSession, EscalationLog, EscalationOutcome, Faq, HistoryOrder,
    NewFaq, NewSession, NewTurn, Session, SupportStats,
};

#[async_trait]
pub trait SupportStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    async fn create_session(&self, input: &NewSession) -> Result<Session, AppError>;

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError>;

    /// Append a turn and touch the session's `updated_utc`.
    /// Fails with `NotFound` if the session does not exist and `BadRequest`
    /// if it has ended.
    async fn append_turn(&self, input: &NewTurn) -> Result<ConversationTurn, AppError>;

    /// The most recent `limit` turns (all when `None`) in the requested order.
    async fn list_turns(
        &self,
        session_id: Uuid,
        limit: Option<i64>,
        order: HistoryOrder,
    ) -> Result<Vec<ConversationTurn>, AppError>;

    /// Record an escalation and move the session to `escalated` unless it is
    /// already escalated or ended.
    async fn escalate(&self, session_id: Uuid, reason: &str)
        -> Result<EscalationOutcome, AppError>;

    /// Mark the session ended with `summary`. An already ended session is
    /// returned unchanged.
    async fn end_session(&self, session_id: Uuid, summary: &str) -> Result<Session, AppError>;

    /// Escalation entries for a session, oldest first.
    async fn escalation_logs(&self, session_id: Uuid) -> Result<Vec<EscalationLog>, AppError>;

    /// Sessions currently escalated, most recently escalated first.
    async fn escalated_sessions(&self) -> Result<Vec<EscalatedSession>, AppError>;

    async fn stats(&self) -> Result<SupportStats, AppError>;

    async fn list_faqs(&self) -> Result<Vec<Faq>, AppError>;

    async fn insert_faq(&self, input: &NewFaq) -> Result<Faq, AppError>;

    /// Insert `faqs` only when no FAQ exists yet. Returns the number inserted.
    async fn seed_faqs(&self, faqs: &[NewFaq]) -> Result<usize, AppError>;
}

pub(crate) fn session_not_found(session_id: Uuid) -> AppError {
    AppError::not_found(format!("Session {} not found", session_id))
}

pub(crate) fn session_closed() -> AppError {
    AppError::bad_request("Session is no longer active")
}
