//! Escalation log model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Session;

/// A record that a session was handed (or re-handed) to a human.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EscalationLog {
    pub escalation_id: i64,
    pub session_id: Uuid,
    pub reason: String,
    pub resolved: bool,
    pub created_utc: DateTime<Utc>,
}

/// Result of an escalate call.
#[derive(Debug, Clone)]
pub struct EscalationOutcome {
    pub session: Session,
    pub log: EscalationLog,
    /// False when the session was already escalated (or ended).
    pub status_changed: bool,
}

/// An escalated session together with its most recent escalation entry.
#[derive(Debug, Clone)]
pub struct EscalatedSession {
    pub session: Session,
    pub latest: Option<EscalationLog>,
}
