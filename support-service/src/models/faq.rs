//! FAQ model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lowest priority value; 1 is the highest priority.
pub const LOWEST_PRIORITY: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Faq {
    pub faq_id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub priority: i32,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a FAQ; also the shape of the bundled seed data.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFaq {
    pub question: String,
    pub answer: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    1
}

impl NewFaq {
    /// Trimmed, lowercased, de-duplicated keywords.
    pub fn normalized_keywords(&self) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::with_capacity(self.keywords.len());
        for keyword in &self.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        keywords
    }

    pub fn clamped_priority(&self) -> i32 {
        self.priority.clamp(1, LOWEST_PRIORITY)
    }
}
