use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// One chat message as delivered by the ingestion side, together with
/// everything the publisher needs to render the translated copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    /// Source text to translate.
    pub content: String,
    /// Display name of the original author.
    pub author_name: String,
    /// Avatar of the original author, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// When the original message was sent.
    pub sent_at: DateTime<Utc>,
    /// Channel the translation is published into.
    pub target_channel_id: String,
}

/// One queued unit of work. Immutable after creation; consumed exactly once
/// by the worker.
#[derive(Debug, Clone)]
pub struct Job {
    pub payload: MessagePayload,
    pub enqueued_at: Instant,
}

impl Job {
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            payload,
            enqueued_at: Instant::now(),
        }
    }
}

/// A finished translation on its way to the publisher.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub channel_id: String,
    pub author_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub text: String,
}

impl OutboundMessage {
    pub fn new(payload: &MessagePayload, text: String) -> Self {
        Self {
            channel_id: payload.target_channel_id.clone(),
            author_name: payload.author_name.clone(),
            avatar_url: payload.avatar_url.clone(),
            sent_at: payload.sent_at,
            text,
        }
    }
}
