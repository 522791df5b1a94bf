use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::not_blank;
use crate::models::{Faq, NewFaq};

#[derive(Debug, Default, Deserialize)]
pub struct FaqQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFaqRequest {
    #[validate(
        length(min = 1, max = 500, message = "Question must be 1-500 characters"),
        custom(function = "not_blank")
    )]
    pub question: String,

    #[validate(
        length(min = 1, max = 5000, message = "Answer must be 1-5000 characters"),
        custom(function = "not_blank")
    )]
    pub answer: String,

    #[validate(
        length(min = 1, max = 100, message = "Category must be 1-100 characters"),
        custom(function = "not_blank")
    )]
    pub category: String,

    #[serde(default)]
    #[validate(length(max = 50, message = "At most 50 keywords"))]
    pub keywords: Vec<String>,

    #[serde(default = "default_priority")]
    #[validate(range(min = 1, max = 5, message = "Priority must be between 1 and 5"))]
    pub priority: i32,
}

fn default_priority() -> i32 {
    1
}

impl From<CreateFaqRequest> for NewFaq {
    fn from(req: CreateFaqRequest) -> Self {
        Self {
            question: req.question,
            answer: req.answer,
            category: req.category,
            keywords: req.keywords,
            priority: req.priority,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaqResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub priority: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Faq> for FaqResponse {
    fn from(faq: Faq) -> Self {
        Self {
            id: faq.faq_id,
            question: faq.question,
            answer: faq.answer,
            category: faq.category,
            keywords: faq.keywords,
            priority: faq.priority,
            is_active: faq.is_active,
            created_at: faq.created_utc,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}
