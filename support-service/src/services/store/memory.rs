//! In-process store backed by a single lock.

use async_trait::async_trait;
use chrono::Utc;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{session_closed, session_not_found, SupportStore};
use crate::models::{
    ConversationTurn, EscalatedSession, EscalationLog, EscalationOutcome, Faq, HistoryOrder,
    NewFaq, NewSession, NewTurn, Session, SessionStatus, SupportStats,
};

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<Uuid, Session>,
    turns: Vec<ConversationTurn>,
    escalations: Vec<EscalationLog>,
    faqs: Vec<Faq>,
    next_turn_id: i64,
    next_escalation_id: i64,
}

#[derive(Default)]
pub struct MemorySupportStore {
    state: RwLock<MemoryState>,
}

impl MemorySupportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn faq_from_input(input: &NewFaq) -> Faq {
    let now = Utc::now();
    Faq {
        faq_id: Uuid::new_v4(),
        question: input.question.trim().to_string(),
        answer: input.answer.trim().to_string(),
        category: input.category.trim().to_string(),
        keywords: input.normalized_keywords(),
        priority: input.clamped_priority(),
        is_active: true,
        created_utc: now,
        updated_utc: now,
    }
}

#[async_trait]
impl SupportStore for MemorySupportStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_session(&self, input: &NewSession) -> Result<Session, AppError> {
        let now = Utc::now();
        let session = Session {
            session_id: Uuid::new_v4(),
            customer_name: input.customer_name.clone(),
            customer_email: input.customer_email.clone(),
            status: SessionStatus::Active.as_str().to_string(),
            summary: None,
            created_utc: now,
            updated_utc: now,
            ended_utc: None,
        };

        self.state
            .write()
            .await
            .sessions
            .insert(session.session_id, session.clone());

        Ok(session)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        Ok(self.state.read().await.sessions.get(&session_id).cloned())
    }

    async fn append_turn(&self, input: &NewTurn) -> Result<ConversationTurn, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let session = state
            .sessions
            .get_mut(&input.session_id)
            .ok_or_else(|| session_not_found(input.session_id))?;
        if !session.status().accepts_messages() {
            return Err(session_closed());
        }
        session.updated_utc = now;

        state.next_turn_id += 1;
        let turn = ConversationTurn {
            turn_id: state.next_turn_id,
            session_id: input.session_id,
            user_message: input.user_message.clone(),
            bot_response: input.bot_response.clone(),
            matched_faq_id: input.matched_faq_id,
            escalated: input.escalated,
            created_utc: now,
        };
        state.turns.push(turn.clone());

        Ok(turn)
    }

    async fn list_turns(
        &self,
        session_id: Uuid,
        limit: Option<i64>,
        order: HistoryOrder,
    ) -> Result<Vec<ConversationTurn>, AppError> {
        let state = self.state.read().await;
        if !state.sessions.contains_key(&session_id) {
            return Err(session_not_found(session_id));
        }

        // Turns are pushed in id order, which is creation order.
        let mut turns: Vec<ConversationTurn> = state
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect();

        if let Some(limit) = limit {
            let keep = limit.max(0) as usize;
            let skip = turns.len().saturating_sub(keep);
            turns.drain(..skip);
        }

        if order == HistoryOrder::ReverseChronological {
            turns.reverse();
        }

        Ok(turns)
    }

    async fn escalate(
        &self,
        session_id: Uuid,
        reason: &str,
    ) -> Result<EscalationOutcome, AppError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;

        let current = session.status();
        let next = current.escalate();
        let status_changed = next != current;
        if status_changed {
            session.status = next.as_str().to_string();
        }
        session.updated_utc = now;
        let session = session.clone();

        state.next_escalation_id += 1;
        let log = EscalationLog {
            escalation_id: state.next_escalation_id,
            session_id,
            reason: reason.to_string(),
            resolved: false,
            created_utc: now,
        };
        state.escalations.push(log.clone());

        Ok(EscalationOutcome {
            session,
            log,
            status_changed,
        })
    }

    async fn end_session(&self, session_id: Uuid, summary: &str) -> Result<Session, AppError> {
        let mut state = self.state.write().await;

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| session_not_found(session_id))?;

        if session.status() != SessionStatus::Ended {
            let now = Utc::now();
            session.status = SessionStatus::Ended.as_str().to_string();
            session.summary = Some(summary.to_string());
            session.updated_utc = now;
            session.ended_utc = Some(now);
        }

        Ok(session.clone())
    }

    async fn escalation_logs(&self, session_id: Uuid) -> Result<Vec<EscalationLog>, AppError> {
        let state = self.state.read().await;
        if !state.sessions.contains_key(&session_id) {
            return Err(session_not_found(session_id));
        }

        Ok(state
            .escalations
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn escalated_sessions(&self) -> Result<Vec<EscalatedSession>, AppError> {
        let state = self.state.read().await;

        let mut escalated: Vec<EscalatedSession> = state
            .sessions
            .values()
            .filter(|s| s.status() == SessionStatus::Escalated)
            .map(|s| EscalatedSession {
                session: s.clone(),
                latest: state
                    .escalations
                    .iter()
                    .rev()
                    .find(|e| e.session_id == s.session_id)
                    .cloned(),
            })
            .collect();

        escalated.sort_by(|a, b| {
            let a_id = a.latest.as_ref().map(|l| l.escalation_id);
            let b_id = b.latest.as_ref().map(|l| l.escalation_id);
            b_id.cmp(&a_id)
        });

        Ok(escalated)
    }

    async fn stats(&self) -> Result<SupportStats, AppError> {
        let state = self.state.read().await;

        let mut stats = SupportStats {
            total_sessions: state.sessions.len() as i64,
            total_turns: state.turns.len() as i64,
            total_escalations: state.escalations.len() as i64,
            ..Default::default()
        };
        for session in state.sessions.values() {
            match session.status() {
                SessionStatus::Active => stats.active_sessions += 1,
                SessionStatus::Escalated => stats.escalated_sessions += 1,
                SessionStatus::Ended => stats.ended_sessions += 1,
            }
        }

        Ok(stats)
    }

    async fn list_faqs(&self) -> Result<Vec<Faq>, AppError> {
        let mut faqs = self.state.read().await.faqs.clone();
        faqs.sort_by_key(|f| f.priority);
        Ok(faqs)
    }

    async fn insert_faq(&self, input: &NewFaq) -> Result<Faq, AppError> {
        let faq = faq_from_input(input);
        self.state.write().await.faqs.push(faq.clone());
        Ok(faq)
    }

    async fn seed_faqs(&self, faqs: &[NewFaq]) -> Result<usize, AppError> {
        let mut state = self.state.write().await;
        if !state.faqs.is_empty() {
            return Ok(0);
        }

        state.faqs.extend(faqs.iter().map(faq_from_input));
        Ok(faqs.len())
    }
}
