use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::not_blank;
use crate::models::Faq;
use crate::services::ChatOutcome;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    pub session_id: Uuid,

    #[validate(
        length(min = 1, max = 4000, message = "Message must be 1-4000 characters"),
        custom(function = "not_blank")
    )]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchedFaqResponse {
    pub faq_id: Uuid,
    pub question: String,
    pub category: String,
}

impl From<Faq> for MatchedFaqResponse {
    fn from(faq: Faq) -> Self {
        Self {
            faq_id: faq.faq_id,
            question: faq.question,
            category: faq.category,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub bot_response: String,
    pub escalated: bool,
    pub matched_faq: Option<MatchedFaqResponse>,
    pub degraded: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            session_id: outcome.turn.session_id,
            bot_response: outcome.turn.bot_response,
            escalated: outcome.escalated,
            matched_faq: outcome.matched_faq.map(MatchedFaqResponse::from),
            degraded: outcome.degraded,
            timestamp: outcome.turn.created_utc,
        }
    }
}
