//! LLM gateway.
//!
//! Wraps a [`TextProvider`] with a per-call timeout and a single retry on
//! transient failures. Callers never see a provider error: replies degrade
//! to [`FALLBACK_REPLY`] and summaries to a fixed note.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::config::LlmConfig;
use crate::models::ConversationTurn;
use crate::services::metrics;
use crate::services::prompt::{build_chat_prompt, build_summary_prompt, SYSTEM_PROMPT_TEMPLATE};
use crate::services::providers::{
    GenerationParams, PromptRequest, ProviderError, ProviderResponse, TextProvider,
};

pub const FALLBACK_REPLY: &str = "I apologize, but I'm having technical difficulties. Please try again later or speak with a human agent.";

pub const EMPTY_SUMMARY: &str = "No conversation history available.";

const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Reply text and what produced it.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub text: String,
    /// Provider response body; `None` when degraded.
    pub raw: Option<serde_json::Value>,
    /// True when the provider failed and `text` is the fallback.
    pub degraded: bool,
}

#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn TextProvider>,
    config: LlmConfig,
    history_limit: usize,
    timeout: Duration,
}

impl LlmGateway {
    pub fn new(provider: Arc<dyn TextProvider>, config: LlmConfig, history_limit: usize) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        Self {
            provider,
            config,
            history_limit,
            timeout,
        }
    }

    /// Override the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Whether the provider answers; used by the readiness check.
    pub async fn health_check(&self) -> Result<(), ProviderError> {
        self.provider.health_check().await
    }

    /// Generate a reply to `user_message` given the chronological `history`.
    #[instrument(skip_all, fields(model = %self.provider.model(), history = history.len()))]
    pub async fn generate_reply(
        &self,
        faq_knowledge: &str,
        history: &[ConversationTurn],
        user_message: &str,
    ) -> LlmReply {
        let prompt = build_chat_prompt(
            SYSTEM_PROMPT_TEMPLATE,
            faq_knowledge,
            history,
            self.history_limit,
            user_message,
        );
        let params = GenerationParams {
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_tokens),
        };

        match self.call_with_retry("reply", &prompt, &params).await {
            Ok(response) => LlmReply {
                text: response.text,
                raw: Some(response.raw),
                degraded: false,
            },
            Err(e) => {
                warn!(error = %e, "Reply generation failed, using fallback");
                LlmReply {
                    text: FALLBACK_REPLY.to_string(),
                    raw: None,
                    degraded: true,
                }
            }
        }
    }

    /// Summarise a full conversation.
    #[instrument(skip_all, fields(model = %self.provider.model(), turns = history.len()))]
    pub async fn summarize(&self, history: &[ConversationTurn]) -> String {
        if history.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }

        let prompt = build_summary_prompt(history);
        let params = GenerationParams {
            temperature: Some(self.config.summary_temperature),
            max_tokens: Some(self.config.summary_max_tokens),
        };

        match self.call_with_retry("summary", &prompt, &params).await {
            Ok(response) => response.text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "Summary generation failed");
                summary_fallback(history.len())
            }
        }
    }

    async fn call_with_retry(
        &self,
        operation: &str,
        prompt: &PromptRequest,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        let max_retries = self.config.max_retries.min(1);
        let mut attempt = 0;

        loop {
            let started = Instant::now();
            let result = match tokio::time::timeout(
                self.timeout,
                self.provider.generate(prompt, params),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
            };
            let elapsed = started.elapsed().as_secs_f64();

            match result {
                Ok(response) => {
                    metrics::record_llm_request(operation, "ok", elapsed);
                    metrics::record_llm_tokens(
                        operation,
                        response.input_tokens,
                        response.output_tokens,
                    );
                    if attempt > 0 {
                        info!(operation, attempt = attempt + 1, "LLM call succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) => {
                    metrics::record_llm_request(operation, e.kind(), elapsed);

                    if attempt >= max_retries || !e.is_retryable() {
                        warn!(
                            operation,
                            attempt = attempt + 1,
                            error = %e,
                            "LLM call failed"
                        );
                        return Err(e);
                    }

                    warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    attempt += 1;
                }
            }
        }
    }
}

pub fn summary_fallback(exchanges: usize) -> String {
    format!(
        "Summary generation failed. Conversation had {} exchanges.",
        exchanges
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::MockTextProvider;
    use chrono::Utc;
    use uuid::Uuid;

    fn llm_config() -> LlmConfig {
        LlmConfig {
            api_key: "test".to_string(),
            model: "mock".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            summary_max_tokens: 300,
            summary_temperature: 0.5,
            timeout_secs: 5,
            max_retries: 1,
        }
    }

    fn gateway(provider: Arc<MockTextProvider>) -> LlmGateway {
        LlmGateway::new(provider, llm_config(), 20)
    }

    fn turn(user: &str, bot: &str) -> ConversationTurn {
        ConversationTurn {
            turn_id: 1,
            session_id: Uuid::new_v4(),
            user_message: user.to_string(),
            bot_response: bot.to_string(),
            matched_faq_id: None,
            escalated: false,
            created_utc: Utc::now(),
        }
    }

    #[tokio::test]
    async fn successful_reply_is_not_degraded() {
        let provider = Arc::new(MockTextProvider::echo());
        let reply = gateway(provider.clone())
            .generate_reply("", &[], "Where is my parcel?")
            .await;

        assert!(!reply.degraded);
        assert_eq!(reply.text, "Mock response for: Where is my parcel?");
        assert!(reply.raw.is_some());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_once() {
        let provider = Arc::new(
            MockTextProvider::fixed("Recovered. [CONTINUE]").then(Err(ProviderError::RateLimited)),
        );
        let reply = gateway(provider.clone()).generate_reply("", &[], "hi").await;

        assert!(!reply.degraded);
        assert_eq!(reply.text, "Recovered. [CONTINUE]");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn persistent_failure_degrades_after_one_retry() {
        let provider = Arc::new(MockTextProvider::failing(ProviderError::NetworkError(
            "connection reset".into(),
        )));
        let reply = gateway(provider.clone()).generate_reply("", &[], "hi").await;

        assert!(reply.degraded);
        assert_eq!(reply.text, FALLBACK_REPLY);
        assert!(reply.raw.is_none());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let provider = Arc::new(MockTextProvider::failing(ProviderError::InvalidRequest(
            "bad".into(),
        )));
        let reply = gateway(provider.clone()).generate_reply("", &[], "hi").await;

        assert!(reply.degraded);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider =
            Arc::new(MockTextProvider::echo().with_delay(Duration::from_millis(500)));
        let reply = gateway(provider.clone())
            .with_timeout(Duration::from_millis(20))
            .generate_reply("", &[], "hi")
            .await;

        assert!(reply.degraded);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn summary_of_empty_history_skips_provider() {
        let provider = Arc::new(MockTextProvider::echo());
        let summary = gateway(provider.clone()).summarize(&[]).await;

        assert_eq!(summary, EMPTY_SUMMARY);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn summary_failure_reports_exchange_count() {
        let provider = Arc::new(MockTextProvider::failing(ProviderError::ContentFiltered));
        let history = vec![turn("a", "b"), turn("c", "d")];
        let summary = gateway(provider).summarize(&history).await;

        assert_eq!(
            summary,
            "Summary generation failed. Conversation had 2 exchanges."
        );
    }

    #[tokio::test]
    async fn summary_covers_transcript() {
        let provider = Arc::new(MockTextProvider::echo());
        let history = vec![turn("My invoice is wrong", "Let me check.")];
        let summary = gateway(provider).summarize(&history).await;

        assert!(summary.contains("My invoice is wrong"));
    }
}
