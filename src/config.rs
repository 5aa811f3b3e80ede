use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // OpenAI
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_url: String,

    // Chat platform (outbound publishing)
    pub chat_bot_token: String,
    pub chat_api_url: String,

    // Queue
    pub settings_file: String,
    pub rate_limit_default: Duration,
    pub rate_limit_min: Duration,
    pub rate_limit_max: Duration,
    pub delay_after_skip: bool,

    // Operator API
    pub api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // OpenAI
            openai_api_key: std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),

            // Chat platform
            chat_bot_token: std::env::var("CHAT_BOT_TOKEN").context("CHAT_BOT_TOKEN not set")?,
            chat_api_url: std::env::var("CHAT_API_URL").context("CHAT_API_URL not set")?,

            // Queue
            settings_file: std::env::var("SETTINGS_FILE")
                .unwrap_or_else(|_| "config.json".to_string()),
            rate_limit_default: duration_from_env("RATE_LIMIT_DEFAULT_MS", 1000),
            rate_limit_min: duration_from_env("RATE_LIMIT_MIN_MS", 100),
            rate_limit_max: duration_from_env("RATE_LIMIT_MAX_MS", 10_000),
            delay_after_skip: std::env::var("DELAY_AFTER_SKIP")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),

            // Operator API
            api_key: std::env::var("API_KEY").ok(),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        })
    }
}

fn duration_from_env(var: &str, default_ms: u64) -> Duration {
    Duration::from_millis(
        std::env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default_ms),
    )
}
