//! Outbound side: posting translated messages to the chat platform.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::queue::OutboundMessage;

#[async_trait]
pub trait Publish: Send + Sync {
    /// Post one translated message to its destination channel.
    async fn publish(&self, message: &OutboundMessage) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    content: &'a str,
    author_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_url: Option<&'a str>,
    sent_at: chrono::DateTime<chrono::Utc>,
}

/// Publishes via the platform's HTTP API: `POST {base}/channels/{id}/messages`
/// with the bot token. Rendering (embeds, attribution style) is the platform
/// side's concern; we send the fields it needs.
pub struct HttpPublisher {
    client: reqwest::Client,
    api_url: String,
    bot_token: String,
}

impl HttpPublisher {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.chat_api_url.trim_end_matches('/').to_string(),
            bot_token: config.chat_bot_token.clone(),
        }
    }
}

#[async_trait]
impl Publish for HttpPublisher {
    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_url, message.channel_id);
        let request = PostMessageRequest {
            content: &message.text,
            author_name: &message.author_name,
            avatar_url: message.avatar_url.as_deref(),
            sent_at: message.sent_at,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.bot_token))
            .json(&request)
            .send()
            .await
            .context("Failed to send message to chat platform")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            anyhow::bail!(
                "Chat platform rejected message for channel {} ({}): {}",
                message.channel_id,
                status,
                body
            );
        }
        Ok(())
    }
}
