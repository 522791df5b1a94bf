//! Domain models for support-service.

mod conversation;
mod escalation;
mod faq;
mod session;

pub use conversation::{ConversationTurn, HistoryOrder, NewTurn};
pub use escalation::{EscalatedSession, EscalationLog, EscalationOutcome};
pub use faq::{Faq, NewFaq};
pub use session::{NewSession, Session, SessionStatus, SupportStats};
