use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{not_blank, trimmed_option};
use crate::models::{ConversationTurn, HistoryOrder, Session};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct StartSessionRequest {
    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(length(max = 200, message = "Customer name is too long"))]
    pub customer_name: Option<String>,

    #[serde(default, deserialize_with = "trimmed_option")]
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub message: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct EscalateRequest {
    #[validate(
        length(min = 1, max = 1000, message = "Reason must be 1-1000 characters"),
        custom(function = "not_blank")
    )]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EscalateResponse {
    pub message: String,
    pub session_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EndSessionResponse {
    pub session_id: Uuid,
    pub status: String,
    pub summary: Option<String>,
}

impl From<Session> for EndSessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            status: session.status,
            summary: session.summary,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Only the most recent `limit` turns.
    pub limit: Option<i64>,
    /// `asc` (default) or `desc`.
    pub order: Option<String>,
}

impl HistoryQuery {
    pub fn history_order(&self) -> HistoryOrder {
        match self.order.as_deref() {
            Some(o) if o.eq_ignore_ascii_case("desc") => HistoryOrder::ReverseChronological,
            _ => HistoryOrder::Chronological,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub turn_id: i64,
    pub user_message: String,
    pub bot_response: String,
    pub matched_faq_id: Option<Uuid>,
    pub escalated: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<ConversationTurn> for TurnResponse {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            turn_id: turn.turn_id,
            user_message: turn.user_message,
            bot_response: turn.bot_response,
            matched_faq_id: turn.matched_faq_id,
            escalated: turn.escalated,
            timestamp: turn.created_utc,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: Uuid,
    pub history: Vec<TurnResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_reason_fails_validation() {
        let req = EscalateRequest {
            reason: "   ".to_string(),
        };
        assert!(req.validate().is_err());

        let req = EscalateRequest {
            reason: "Customer asked for a call back".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn email_is_checked_only_when_present() {
        assert!(StartSessionRequest::default().validate().is_ok());

        let req = StartSessionRequest {
            customer_name: None,
            customer_email: Some("not-an-email".to_string()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn customer_fields_are_trimmed_before_validation() {
        let req: StartSessionRequest = serde_json::from_value(serde_json::json!({
            "customer_name": "   ",
            "customer_email": " ana@example.com "
        }))
        .unwrap();

        assert_eq!(req.customer_name, None);
        assert_eq!(req.customer_email.as_deref(), Some("ana@example.com"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn history_order_defaults_to_chronological() {
        assert_eq!(
            HistoryQuery::default().history_order(),
            HistoryOrder::Chronological
        );
        let query = HistoryQuery {
            limit: None,
            order: Some("DESC".to_string()),
        };
        assert_eq!(query.history_order(), HistoryOrder::ReverseChronological);
    }
}
