pub mod escalation;
pub mod faq;
pub mod gateway;
pub mod metrics;
pub mod prompt;
pub mod providers;
pub mod store;
pub mod support;

pub use escalation::{EscalationClassifier, EscalationTrigger};
pub use faq::{FaqMatch, FaqStore};
pub use gateway::{LlmGateway, LlmReply};
pub use store::{MemorySupportStore, PgSupportStore, SupportStore};
pub use support::{ChatOutcome, SupportService};
