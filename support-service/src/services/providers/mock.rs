//! Scripted provider for tests and offline runs.

use super::{
    FinishReason, GenerationParams, PromptRequest, ProviderError, ProviderResponse, TextProvider,
};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum MockMode {
    /// Reply with "Mock response for: <last user message>".
    Echo,
    Fixed(String),
    Fail(ProviderError),
}

/// Provider whose behaviour is fixed at construction.
///
/// Queued results are consumed first, one per call; after that the base mode
/// answers every call.
pub struct MockTextProvider {
    mode: MockMode,
    queued: Mutex<VecDeque<Result<String, ProviderError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<PromptRequest>>,
}

impl MockTextProvider {
    fn with_mode(mode: MockMode) -> Self {
        Self {
            mode,
            queued: Mutex::new(VecDeque::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn echo() -> Self {
        Self::with_mode(MockMode::Echo)
    }

    pub fn fixed(reply: impl Into<String>) -> Self {
        Self::with_mode(MockMode::Fixed(reply.into()))
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_mode(MockMode::Fail(error))
    }

    /// Queue a one-off result ahead of the base mode.
    pub fn then(self, result: Result<String, ProviderError>) -> Self {
        self.queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(result);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `generate` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The prompt of the most recent `generate` call.
    pub fn last_prompt(&self) -> Option<PromptRequest> {
        self.last_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_result(&self, prompt: &PromptRequest) -> Result<String, ProviderError> {
        if let Some(result) = self
            .queued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            return result;
        }

        match &self.mode {
            MockMode::Echo => Ok(format!(
                "Mock response for: {}",
                prompt.last_user_message().unwrap_or_default()
            )),
            MockMode::Fixed(reply) => Ok(reply.clone()),
            MockMode::Fail(error) => Err(error.clone()),
        }
    }
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self::echo()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &PromptRequest,
        _params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = self.next_result(prompt)?;
        Ok(ProviderResponse {
            raw: serde_json::json!({ "model": "mock", "text": text }),
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Complete,
            text,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        match &self.mode {
            MockMode::Fail(error) => Err(error.clone()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ChatMessage;

    fn prompt(text: &str) -> PromptRequest {
        PromptRequest {
            system: None,
            messages: vec![ChatMessage::user(text)],
        }
    }

    #[tokio::test]
    async fn echo_repeats_last_user_message() {
        let provider = MockTextProvider::echo();
        let response = provider
            .generate(&prompt("hello"), &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(response.text, "Mock response for: hello");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn queued_results_come_first() {
        let provider = MockTextProvider::fixed("steady").then(Err(ProviderError::RateLimited));
        let params = GenerationParams::default();

        assert_eq!(
            provider.generate(&prompt("a"), &params).await.unwrap_err(),
            ProviderError::RateLimited
        );
        assert_eq!(
            provider.generate(&prompt("a"), &params).await.unwrap().text,
            "steady"
        );
        assert_eq!(provider.calls(), 2);
    }
}
