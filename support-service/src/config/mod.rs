use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Upper bound on the number of prior turns replayed into a prompt.
pub const MAX_HISTORY_TURNS: usize = 20;

/// Connection string that selects the in-process store instead of Postgres.
pub const MEMORY_DATABASE_URL: &str = "memory://";

#[derive(Debug, Clone, Deserialize)]
pub struct SupportConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub allowed_origins: Vec<String>,
    pub frontend_dir: Option<String>,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with(MEMORY_DATABASE_URL)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: i32,
    pub temperature: f32,
    pub summary_max_tokens: i32,
    pub summary_temperature: f32,
    pub timeout_secs: u64,
    /// Retries after the first attempt; at most one.
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Prior turns replayed into each prompt, clamped to `1..=MAX_HISTORY_TURNS`.
    pub history_limit: usize,
    pub faq_min_match_score: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: MAX_HISTORY_TURNS,
            faq_min_match_score: 2,
        }
    }
}

impl SupportConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let allowed_origins = get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(SupportConfig {
            common: common_config,
            service_name: get_env("SERVICE_NAME", Some("support-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            allowed_origins,
            frontend_dir: env::var("FRONTEND_DIR").ok().filter(|v| !v.is_empty()),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5, is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 1, is_prod)?,
            },
            llm: LlmConfig {
                api_key: get_env("GEMINI_API_KEY", None, is_prod)?,
                model: get_env("MODEL_NAME", Some("gemini-1.5-flash"), is_prod)?,
                max_tokens: parse_env("MAX_TOKENS", 1000, is_prod)?,
                temperature: parse_env("TEMPERATURE", 0.7, is_prod)?,
                summary_max_tokens: parse_env("SUMMARY_MAX_TOKENS", 300, is_prod)?,
                summary_temperature: parse_env("SUMMARY_TEMPERATURE", 0.5, is_prod)?,
                timeout_secs: parse_env("LLM_TIMEOUT_SECS", 30, is_prod)?,
                max_retries: parse_env::<u32>("LLM_MAX_RETRIES", 1, is_prod)?.min(1),
            },
            chat: ChatConfig {
                history_limit: clamp_history_limit(parse_env(
                    "CHAT_HISTORY_LIMIT",
                    MAX_HISTORY_TURNS,
                    is_prod,
                )?),
                faq_min_match_score: parse_env("FAQ_MIN_MATCH_SCORE", 2, is_prod)?,
            },
        })
    }
}

pub fn clamp_history_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_HISTORY_TURNS)
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(&default.to_string()), is_prod)?;
    raw.trim().parse::<T>().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_limit_is_clamped() {
        assert_eq!(clamp_history_limit(0), 1);
        assert_eq!(clamp_history_limit(10), 10);
        assert_eq!(clamp_history_limit(500), MAX_HISTORY_TURNS);
    }

    #[test]
    fn memory_url_selects_in_memory_store() {
        let db = DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 1,
            min_connections: 1,
        };
        assert!(db.is_in_memory());

        let db = DatabaseConfig {
            url: "postgres://localhost/support".to_string(),
            ..db
        };
        assert!(!db.is_in_memory());
    }
}
