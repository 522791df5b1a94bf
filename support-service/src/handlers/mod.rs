pub mod admin;
pub mod chat;
pub mod faqs;
pub mod health;
pub mod metrics;
pub mod sessions;

pub use admin::{escalated_sessions, stats};
pub use chat::chat;
pub use faqs::{create_faq, list_categories, list_faqs};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use sessions::{end_session, escalate_session, get_history, get_summary, start_session};
