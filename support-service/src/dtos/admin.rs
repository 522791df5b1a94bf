use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::EscalatedSession;

#[derive(Debug, Serialize, Deserialize)]
pub struct EscalatedSessionResponse {
    pub session_id: Uuid,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub escalation_reason: Option<String>,
    pub escalation_time: Option<DateTime<Utc>>,
    pub resolved: bool,
}

impl From<EscalatedSession> for EscalatedSessionResponse {
    fn from(escalated: EscalatedSession) -> Self {
        let EscalatedSession { session, latest } = escalated;
        Self {
            session_id: session.session_id,
            customer_name: session.customer_name,
            customer_email: session.customer_email,
            created_at: session.created_utc,
            resolved: latest.as_ref().map_or(false, |l| l.resolved),
            escalation_reason: latest.as_ref().map(|l| l.reason.clone()),
            escalation_time: latest.map(|l| l.created_utc),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EscalatedSessionsResponse {
    pub escalated_sessions: Vec<EscalatedSessionResponse>,
}
