//! Conversation turn model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One user message and the bot's reply. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConversationTurn {
    pub turn_id: i64,
    pub session_id: Uuid,
    pub user_message: String,
    pub bot_response: String,
    pub matched_faq_id: Option<Uuid>,
    pub escalated: bool,
    pub created_utc: DateTime<Utc>,
}

/// Input for appending a turn.
#[derive(Debug, Clone)]
pub struct NewTurn {
    pub session_id: Uuid,
    pub user_message: String,
    pub bot_response: String,
    pub matched_faq_id: Option<Uuid>,
    pub escalated: bool,
}

/// Ordering of a history read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrder {
    /// Oldest first; used to rebuild prompts.
    Chronological,
    /// Newest first; used for display.
    ReverseChronological,
}
