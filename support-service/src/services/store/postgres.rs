//! PostgreSQL store.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{session_closed, session_not_found, SupportStore};
use crate::models::{
    ConversationTurn, EscalatedSession, EscalationLog, EscalationOutcome, Faq, HistoryOrder,
    NewFaq, NewSession, NewTurn, Session, SessionStatus, SupportStats,
};

const SESSION_COLUMNS: &str =
    "session_id, customer_name, customer_email, status, summary, created_utc, updated_utc, ended_utc";
const TURN_COLUMNS: &str =
    "turn_id, session_id, user_message, bot_response, matched_faq_id, escalated, created_utc";
const FAQ_COLUMNS: &str =
    "faq_id, question, answer, category, keywords, priority, is_active, created_utc, updated_utc";
const ESCALATION_COLUMNS: &str = "escalation_id, session_id, reason, resolved, created_utc";

fn db_error(context: &str, e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct PgSupportStore {
    pool: PgPool,
}

impl PgSupportStore {
    #[instrument(skip(database_url), fields(service = "support-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| db_error("Failed to connect", e))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    async fn insert_faq_with<'e, E>(executor: E, input: &NewFaq) -> Result<Faq, AppError>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query_as::<_, Faq>(&format!(
            r#"
            INSERT INTO faqs (faq_id, question, answer, category, keywords, priority, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING {}
            "#,
            FAQ_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.question.trim())
        .bind(input.answer.trim())
        .bind(input.category.trim())
        .bind(input.normalized_keywords())
        .bind(input.clamped_priority())
        .fetch_one(executor)
        .await
        .map_err(|e| db_error("Failed to insert FAQ", e))
    }
}

#[async_trait]
impl SupportStore for PgSupportStore {
    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Health check failed", e))?;
        Ok(())
    }

    #[instrument(skip(self, input))]
    async fn create_session(&self, input: &NewSession) -> Result<Session, AppError> {
        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            INSERT INTO sessions (session_id, customer_name, customer_email, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&input.customer_name)
        .bind(&input.customer_email)
        .bind(SessionStatus::Active.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create session", e))?;

        info!(session_id = %session.session_id, "Session created");
        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn get_session(&self, session_id: Uuid) -> Result<Option<Session>, AppError> {
        sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE session_id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to get session", e))
    }

    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    async fn append_turn(&self, input: &NewTurn) -> Result<ConversationTurn, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let current = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE session_id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(input.session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock session", e))?
        .ok_or_else(|| session_not_found(input.session_id))?;

        // An end that committed while the reply was generated wins.
        if !current.status().accepts_messages() {
            return Err(session_closed());
        }

        sqlx::query("UPDATE sessions SET updated_utc = NOW() WHERE session_id = $1")
            .bind(input.session_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to touch session", e))?;

        let turn = sqlx::query_as::<_, ConversationTurn>(&format!(
            r#"
            INSERT INTO conversation_turns (session_id, user_message, bot_response, matched_faq_id, escalated)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            TURN_COLUMNS
        ))
        .bind(input.session_id)
        .bind(&input.user_message)
        .bind(&input.bot_response)
        .bind(input.matched_faq_id)
        .bind(input.escalated)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                session_not_found(input.session_id)
            }
            _ => db_error("Failed to append turn", e),
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit turn", e))?;

        Ok(turn)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn list_turns(
        &self,
        session_id: Uuid,
        limit: Option<i64>,
        order: HistoryOrder,
    ) -> Result<Vec<ConversationTurn>, AppError> {
        if self.get_session(session_id).await?.is_none() {
            return Err(session_not_found(session_id));
        }

        let outer_order = match order {
            HistoryOrder::Chronological => "ASC",
            HistoryOrder::ReverseChronological => "DESC",
        };

        // Inner query picks the most recent `limit` turns; NULL means no limit.
        sqlx::query_as::<_, ConversationTurn>(&format!(
            r#"
            SELECT {cols} FROM (
                SELECT {cols} FROM conversation_turns
                WHERE session_id = $1
                ORDER BY created_utc DESC, turn_id DESC
                LIMIT $2
            ) recent
            ORDER BY created_utc {ord}, turn_id {ord}
            "#,
            cols = TURN_COLUMNS,
            ord = outer_order
        ))
        .bind(session_id)
        .bind(limit.map(|l| l.max(0)))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list turns", e))
    }

    #[instrument(skip(self, reason), fields(session_id = %session_id))]
    async fn escalate(
        &self,
        session_id: Uuid,
        reason: &str,
    ) -> Result<EscalationOutcome, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let current = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE session_id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock session", e))?
        .ok_or_else(|| session_not_found(session_id))?;

        let status = current.status();
        let next = status.escalate();

        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            UPDATE sessions SET status = $2, updated_utc = NOW()
            WHERE session_id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update session status", e))?;

        let log = sqlx::query_as::<_, EscalationLog>(&format!(
            r#"
            INSERT INTO escalation_logs (session_id, reason)
            VALUES ($1, $2)
            RETURNING {}
            "#,
            ESCALATION_COLUMNS
        ))
        .bind(session_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to record escalation", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit escalation", e))?;

        info!(
            escalation_id = log.escalation_id,
            from = %status,
            to = %next,
            "Escalation recorded"
        );

        Ok(EscalationOutcome {
            session,
            log,
            status_changed: next != status,
        })
    }

    #[instrument(skip(self, summary), fields(session_id = %session_id))]
    async fn end_session(&self, session_id: Uuid, summary: &str) -> Result<Session, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        let current = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE session_id = $1 FOR UPDATE",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to lock session", e))?
        .ok_or_else(|| session_not_found(session_id))?;

        if current.status() == SessionStatus::Ended {
            tx.commit()
                .await
                .map_err(|e| db_error("Failed to commit", e))?;
            return Ok(current);
        }

        let session = sqlx::query_as::<_, Session>(&format!(
            r#"
            UPDATE sessions
            SET status = $2, summary = $3, updated_utc = NOW(), ended_utc = NOW()
            WHERE session_id = $1
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(SessionStatus::Ended.as_str())
        .bind(summary)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to end session", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit session end", e))?;

        info!("Session ended");
        Ok(session)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn escalation_logs(&self, session_id: Uuid) -> Result<Vec<EscalationLog>, AppError> {
        if self.get_session(session_id).await?.is_none() {
            return Err(session_not_found(session_id));
        }

        sqlx::query_as::<_, EscalationLog>(&format!(
            "SELECT {} FROM escalation_logs WHERE session_id = $1 ORDER BY escalation_id",
            ESCALATION_COLUMNS
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list escalation logs", e))
    }

    #[instrument(skip(self))]
    async fn escalated_sessions(&self) -> Result<Vec<EscalatedSession>, AppError> {
        let sessions = sqlx::query_as::<_, Session>(&format!(
            "SELECT {} FROM sessions WHERE status = $1",
            SESSION_COLUMNS
        ))
        .bind(SessionStatus::Escalated.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list escalated sessions", e))?;

        let latest = sqlx::query_as::<_, EscalationLog>(
            r#"
            SELECT DISTINCT ON (l.session_id)
                l.escalation_id, l.session_id, l.reason, l.resolved, l.created_utc
            FROM escalation_logs l
            JOIN sessions s ON s.session_id = l.session_id
            WHERE s.status = $1
            ORDER BY l.session_id, l.escalation_id DESC
            "#,
        )
        .bind(SessionStatus::Escalated.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load latest escalations", e))?;

        let mut latest_by_session: HashMap<Uuid, EscalationLog> =
            latest.into_iter().map(|l| (l.session_id, l)).collect();

        let mut escalated: Vec<EscalatedSession> = sessions
            .into_iter()
            .map(|session| EscalatedSession {
                latest: latest_by_session.remove(&session.session_id),
                session,
            })
            .collect();

        escalated.sort_by(|a, b| {
            let a_id = a.latest.as_ref().map(|l| l.escalation_id);
            let b_id = b.latest.as_ref().map(|l| l.escalation_id);
            b_id.cmp(&a_id)
        });

        Ok(escalated)
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<SupportStats, AppError> {
        let (total, active, escalated, ended, turns, escalations) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'active'),
                    COUNT(*) FILTER (WHERE status = 'escalated'),
                    COUNT(*) FILTER (WHERE status = 'ended'),
                    (SELECT COUNT(*) FROM conversation_turns),
                    (SELECT COUNT(*) FROM escalation_logs)
                FROM sessions
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to compute stats", e))?;

        Ok(SupportStats {
            total_sessions: total,
            active_sessions: active,
            escalated_sessions: escalated,
            ended_sessions: ended,
            total_turns: turns,
            total_escalations: escalations,
        })
    }

    #[instrument(skip(self))]
    async fn list_faqs(&self) -> Result<Vec<Faq>, AppError> {
        sqlx::query_as::<_, Faq>(&format!(
            "SELECT {} FROM faqs ORDER BY priority, created_utc, faq_id",
            FAQ_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list FAQs", e))
    }

    #[instrument(skip(self, input), fields(category = %input.category))]
    async fn insert_faq(&self, input: &NewFaq) -> Result<Faq, AppError> {
        let faq = Self::insert_faq_with(&self.pool, input).await?;
        info!(faq_id = %faq.faq_id, "FAQ created");
        Ok(faq)
    }

    #[instrument(skip(self, faqs), fields(count = faqs.len()))]
    async fn seed_faqs(&self, faqs: &[NewFaq]) -> Result<usize, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // Serialise concurrent seeders so only one fills the table.
        sqlx::query("LOCK TABLE faqs IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to lock faqs", e))?;

        let (existing,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM faqs")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to count FAQs", e))?;
        if existing > 0 {
            return Ok(0);
        }

        for faq in faqs {
            Self::insert_faq_with(&mut *tx, faq).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit FAQ seed", e))?;

        info!(count = faqs.len(), "FAQs seeded");
        Ok(faqs.len())
    }
}
