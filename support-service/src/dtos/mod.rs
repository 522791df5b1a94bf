//! Request and response bodies for the HTTP API.

pub mod admin;
pub mod chat;
pub mod faqs;
pub mod sessions;

pub use admin::{EscalatedSessionResponse, EscalatedSessionsResponse};
pub use chat::{ChatRequest, ChatResponse, MatchedFaqResponse};
pub use faqs::{CategoriesResponse, CreateFaqRequest, FaqQuery, FaqResponse};
pub use sessions::{
    EndSessionResponse, EscalateRequest, EscalateResponse, HistoryQuery, HistoryResponse,
    StartSessionRequest, StartSessionResponse, SummaryResponse, TurnResponse,
};

use serde::{Deserialize, Deserializer};
use validator::ValidationError;

/// Rejects strings that are empty after trimming.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

/// Optional string trimmed on the way in; blank values become `None` so that
/// field rules see the value the service stores.
pub(crate) fn trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}
