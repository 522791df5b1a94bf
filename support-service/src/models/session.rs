//! Chat session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Session lifecycle status.
///
/// `Active -> Escalated -> Ended` or `Active -> Ended`; never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Escalated,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Escalated => "escalated",
            SessionStatus::Ended => "ended",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "escalated" => SessionStatus::Escalated,
            "ended" => SessionStatus::Ended,
            _ => SessionStatus::Active,
        }
    }

    /// Status after an escalation request. Ended sessions stay ended.
    pub fn escalate(self) -> Self {
        match self {
            SessionStatus::Active | SessionStatus::Escalated => SessionStatus::Escalated,
            SessionStatus::Ended => SessionStatus::Ended,
        }
    }

    /// Whether the session still accepts chat messages.
    pub fn accepts_messages(&self) -> bool {
        !matches!(self, SessionStatus::Ended)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer's chat interaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub session_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: String,
    pub summary: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
    pub ended_utc: Option<DateTime<Utc>>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        SessionStatus::from_string(&self.status)
    }
}

/// Input for starting a session.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SupportStats {
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub escalated_sessions: i64,
    pub ended_sessions: i64,
    pub total_turns: i64,
    pub total_escalations: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_never_reopens_an_ended_session() {
        assert_eq!(SessionStatus::Active.escalate(), SessionStatus::Escalated);
        assert_eq!(SessionStatus::Escalated.escalate(), SessionStatus::Escalated);
        assert_eq!(SessionStatus::Ended.escalate(), SessionStatus::Ended);
    }

    #[test]
    fn status_round_trips_through_storage_string() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Escalated,
            SessionStatus::Ended,
        ] {
            assert_eq!(SessionStatus::from_string(status.as_str()), status);
        }
    }
}
