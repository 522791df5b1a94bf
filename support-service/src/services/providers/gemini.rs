//! Gemini text provider.
//!
//! Calls the `generateContent` REST method. Prior turns are sent as
//! alternating `user`/`model` contents and the system prompt as
//! `systemInstruction`.

use super::{
    FinishReason, GenerationParams, PromptRequest, ProviderError, ProviderResponse, Role,
    TextProvider,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            timeout,
        }
    }
}

pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    fn build_request(prompt: &PromptRequest, params: &GenerationParams) -> GenerateContentRequest {
        let contents = prompt
            .messages
            .iter()
            .map(|message| Content {
                role: Some(
                    match message.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![ContentPart {
                    text: message.content.clone(),
                }],
            })
            .collect();

        GenerateContentRequest {
            system_instruction: prompt.system.as_ref().map(|system| Content {
                role: None,
                parts: vec![ContentPart {
                    text: system.clone(),
                }],
            }),
            contents,
            generation_config: Some(GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            }),
        }
    }
}

fn parse_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("MAX_TOKENS") => FinishReason::Length,
        Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
            FinishReason::ContentFilter
        }
        Some("STOP") | None => FinishReason::Complete,
        Some(_) => FinishReason::Error,
    }
}

fn map_status(status: StatusCode, body: String) -> ProviderError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited
    } else if status.is_server_error() {
        ProviderError::ServerError {
            status: status.as_u16(),
            message: body,
        }
    } else if status == StatusCode::BAD_REQUEST {
        ProviderError::InvalidRequest(body)
    } else {
        ProviderError::ApiError(format!("Gemini API error {}: {}", status, body))
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        prompt: &PromptRequest,
        params: &GenerationParams,
    ) -> Result<ProviderResponse, ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let request = Self::build_request(prompt, params);

        tracing::debug!(
            model = %self.config.model,
            message_count = prompt.messages.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url("generateContent"))
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.config.timeout.as_secs())
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(map_status(status, error_text));
        }

        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to read response: {}", e)))?;

        let api_response: GenerateContentResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        if api_response.candidates.is_empty() {
            if api_response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_ref())
                .is_some()
            {
                return Err(ProviderError::ContentFiltered);
            }
            return Err(ProviderError::EmptyResponse);
        }

        let candidate = &api_response.candidates[0];
        let finish_reason = parse_finish_reason(candidate.finish_reason.as_deref());
        if finish_reason == FinishReason::ContentFilter {
            return Err(ProviderError::ContentFiltered);
        }

        let text = candidate
            .content
            .as_ref()
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let usage = api_response.usage_metadata.unwrap_or_default();

        Ok(ProviderResponse {
            text,
            raw,
            input_tokens: usage.prompt_token_count.unwrap_or(0),
            output_tokens: usage.candidates_token_count.unwrap_or(0),
            finish_reason,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }

        let url = format!("{}/models/{}", self.config.base_url, self.config.model);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<i32>,
    candidates_token_count: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::ChatMessage;

    #[test]
    fn request_uses_gemini_roles_and_system_instruction() {
        let prompt = PromptRequest {
            system: Some("be nice".to_string()),
            messages: vec![
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("help"),
            ],
        };
        let params = GenerationParams {
            temperature: Some(0.7),
            max_tokens: Some(1000),
        };

        let body = serde_json::to_value(GeminiTextProvider::build_request(&prompt, &params))
            .unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be nice");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["text"], "help");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn status_codes_map_to_provider_errors() {
        assert_eq!(
            map_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::RateLimited
        );
        assert!(map_status(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_retryable());
        assert!(!map_status(StatusCode::FORBIDDEN, String::new()).is_retryable());
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, "bad".into()),
            ProviderError::InvalidRequest(_)
        ));
    }

    #[test]
    fn finish_reasons_are_parsed() {
        assert_eq!(parse_finish_reason(Some("STOP")), FinishReason::Complete);
        assert_eq!(parse_finish_reason(None), FinishReason::Complete);
        assert_eq!(parse_finish_reason(Some("MAX_TOKENS")), FinishReason::Length);
        assert_eq!(
            parse_finish_reason(Some("SAFETY")),
            FinishReason::ContentFilter
        );
        assert_eq!(parse_finish_reason(Some("OTHER")), FinishReason::Error);
    }

    #[test]
    fn response_text_is_parsed() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello " }, { "text": "there" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 3 }
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();
        let content = parsed.candidates[0].content.as_ref().unwrap();
        assert_eq!(content.parts.len(), 2);
        assert_eq!(parsed.usage_metadata.unwrap().prompt_token_count, Some(12));
    }
}
