//! Support service: composes the store, FAQ cache, LLM gateway and
//! escalation classifier into the chat-session operations.

use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    ConversationTurn, EscalatedSession, EscalationOutcome, Faq, HistoryOrder, NewFaq, NewSession,
    NewTurn, Session, SessionStatus, SupportStats,
};
use crate::services::escalation::{strip_control_tags, EscalationClassifier};
use crate::services::faq::FaqStore;
use crate::services::gateway::{LlmGateway, FALLBACK_REPLY};
use crate::services::metrics;
use crate::services::store::{session_closed, session_not_found, SupportStore};

/// Shown when the model replied with nothing but a handoff tag.
pub const HANDOFF_REPLY: &str =
    "I'm connecting you with a human agent who can help you further.";

pub const MANUAL_ESCALATION_PREFIX: &str = "Manual escalation";

/// Result of processing one customer message.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub turn: ConversationTurn,
    pub matched_faq: Option<Faq>,
    pub escalated: bool,
    /// The model call failed and the reply is the fallback apology.
    pub degraded: bool,
}

#[derive(Clone)]
pub struct SupportService {
    store: Arc<dyn SupportStore>,
    faqs: FaqStore,
    gateway: LlmGateway,
    classifier: EscalationClassifier,
    history_limit: usize,
}

impl SupportService {
    pub fn new(
        store: Arc<dyn SupportStore>,
        faqs: FaqStore,
        gateway: LlmGateway,
        classifier: EscalationClassifier,
        history_limit: usize,
    ) -> Self {
        Self {
            store,
            faqs,
            gateway,
            classifier,
            history_limit,
        }
    }

    pub fn store(&self) -> &Arc<dyn SupportStore> {
        &self.store
    }

    pub fn faqs(&self) -> &FaqStore {
        &self.faqs
    }

    pub fn gateway(&self) -> &LlmGateway {
        &self.gateway
    }

    /// Seed the FAQ table when empty, then load every FAQ into the cache.
    #[instrument(skip(self, seed), fields(seed = seed.len()))]
    pub async fn load_faqs(&self, seed: &[NewFaq]) -> Result<usize, AppError> {
        let seeded = self.store.seed_faqs(seed).await?;
        let faqs = self.store.list_faqs().await?;
        let count = faqs.len();
        self.faqs.replace_all(faqs);

        info!(seeded, loaded = count, "FAQ cache loaded");
        Ok(count)
    }

    #[instrument(skip(self, input))]
    pub async fn start_session(&self, input: NewSession) -> Result<Session, AppError> {
        let input = NewSession {
            customer_name: non_blank(input.customer_name),
            customer_email: non_blank(input.customer_email),
        };
        let session = self.store.create_session(&input).await?;

        metrics::record_session_event("started");
        info!(session_id = %session.session_id, "Support session started");
        Ok(session)
    }

    async fn require_session(&self, session_id: Uuid) -> Result<Session, AppError> {
        self.store
            .get_session(session_id)
            .await?
            .ok_or_else(|| session_not_found(session_id))
    }

    /// Process one customer message: match FAQs, ask the model, classify
    /// for escalation, persist the turn.
    #[instrument(skip(self, message), fields(session_id = %session_id))]
    pub async fn chat(&self, session_id: Uuid, message: &str) -> Result<ChatOutcome, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::bad_request("Message must not be empty"));
        }

        let session = self.require_session(session_id).await?;
        if !session.status().accepts_messages() {
            return Err(session_closed());
        }

        let history = self
            .store
            .list_turns(
                session_id,
                Some(self.history_limit as i64),
                HistoryOrder::Chronological,
            )
            .await?;

        let faq_match = self.faqs.find_match(message);
        metrics::record_faq_lookup(faq_match.is_some());

        let reply = self
            .gateway
            .generate_reply(&self.faqs.knowledge_text(), &history, message)
            .await;

        let trigger = self.classifier.classify(message, &reply.text);
        let escalated = trigger.is_some();

        let mut bot_response = strip_control_tags(&reply.text);
        if bot_response.is_empty() {
            bot_response = if escalated {
                HANDOFF_REPLY.to_string()
            } else {
                FALLBACK_REPLY.to_string()
            };
        }

        let turn = self
            .store
            .append_turn(&NewTurn {
                session_id,
                user_message: message.to_string(),
                bot_response,
                matched_faq_id: faq_match.as_ref().map(|m| m.faq.faq_id),
                escalated,
            })
            .await?;

        if let Some(trigger) = trigger {
            let outcome = self.store.escalate(session_id, &trigger.reason()).await?;
            metrics::record_escalation(trigger.label());
            info!(
                trigger = trigger.label(),
                status_changed = outcome.status_changed,
                "Session escalated automatically"
            );
        }

        metrics::record_chat_message();
        if reply.degraded {
            warn!("Replied with fallback message");
        }

        Ok(ChatOutcome {
            turn,
            matched_faq: faq_match.map(|m| m.faq),
            escalated,
            degraded: reply.degraded,
        })
    }

    /// Turns of a session, most recent `limit` (all when `None`).
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn history(
        &self,
        session_id: Uuid,
        limit: Option<i64>,
        order: HistoryOrder,
    ) -> Result<Vec<ConversationTurn>, AppError> {
        self.store.list_turns(session_id, limit, order).await
    }

    /// Hand a session to a human on request. Always records a log entry.
    #[instrument(skip(self, reason), fields(session_id = %session_id))]
    pub async fn escalate_manually(
        &self,
        session_id: Uuid,
        reason: &str,
    ) -> Result<EscalationOutcome, AppError> {
        let reason = format!("{}: {}", MANUAL_ESCALATION_PREFIX, reason.trim());
        let outcome = self.store.escalate(session_id, &reason).await?;

        metrics::record_escalation("manual");
        info!(
            status = %outcome.session.status(),
            status_changed = outcome.status_changed,
            "Session escalated manually"
        );
        Ok(outcome)
    }

    /// End a session, storing a generated summary. Ending an ended session
    /// returns it with the summary it already has.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn end_session(&self, session_id: Uuid) -> Result<Session, AppError> {
        let session = self.require_session(session_id).await?;
        if session.status() == SessionStatus::Ended {
            return Ok(session);
        }

        let turns = self
            .store
            .list_turns(session_id, None, HistoryOrder::Chronological)
            .await?;
        let summary = self.gateway.summarize(&turns).await;

        let session = self.store.end_session(session_id, &summary).await?;
        metrics::record_session_event("ended");
        info!(turns = turns.len(), "Support session ended");
        Ok(session)
    }

    /// Summary of a session: the stored one once ended, otherwise generated
    /// on demand. `NotFound` when the session has no turns yet.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn summary(&self, session_id: Uuid) -> Result<String, AppError> {
        let session = self.require_session(session_id).await?;
        if let Some(summary) = session.summary {
            return Ok(summary);
        }

        let turns = self
            .store
            .list_turns(session_id, None, HistoryOrder::Chronological)
            .await?;
        if turns.is_empty() {
            return Err(AppError::not_found(
                "No conversation history available for this session",
            ));
        }

        Ok(self.gateway.summarize(&turns).await)
    }

    pub async fn stats(&self) -> Result<SupportStats, AppError> {
        self.store.stats().await
    }

    pub async fn escalated_sessions(&self) -> Result<Vec<EscalatedSession>, AppError> {
        self.store.escalated_sessions().await
    }

    pub fn list_faqs(&self, category: Option<&str>) -> Vec<Faq> {
        self.faqs.list(category)
    }

    pub fn faq_categories(&self) -> Vec<String> {
        self.faqs.categories()
    }

    /// Persist a FAQ and make it matchable immediately.
    #[instrument(skip(self, input), fields(category = %input.category))]
    pub async fn create_faq(&self, input: NewFaq) -> Result<Faq, AppError> {
        let faq = self.store.insert_faq(&input).await?;
        self.faqs.insert(faq.clone());
        Ok(faq)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
