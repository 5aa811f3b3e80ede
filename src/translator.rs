//! Translation of chat messages into English.
//!
//! The queue core only sees the [`Translate`] trait: text in, `Ok(Some)` for
//! a translation, `Ok(None)` when the message does not need one. The
//! production implementation calls the OpenAI chat-completions API, but it
//! filters first: empty messages, link-only messages, and messages that are
//! mostly common English words never reach the API. Messages mixing text and
//! links get only their text segments translated, links passed through
//! verbatim.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::retry::{with_retry_if, RetryConfig};

#[async_trait]
pub trait Translate: Send + Sync {
    /// Translate `text` into English. `Ok(None)` means no translation is
    /// needed (already English, link-only, empty); the message is skipped.
    async fn translate(&self, text: &str) -> Result<Option<String>>;
}

// === OpenAI-backed implementation ===

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

const SYSTEM_PROMPT: &str = "Translate non-English text to English. \
For English text or slang (jk, gg, lol, etc.), return it unchanged. \
Reply with only the translation or the original text, nothing else.";

pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiTranslator {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.openai_api_url.clone(),
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
        }
    }

    /// Translate one link-free text segment. `None` when the model judges the
    /// text already English (it echoes the input back unchanged).
    async fn translate_segment(&self, text: &str) -> Result<Option<String>> {
        if looks_like_english(text) {
            debug!("segment is mostly common English words, skipping API call");
            return Ok(None);
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            max_completion_tokens: 1000,
            temperature: Some(0.3),
        };

        let translated = with_retry_if(
            &RetryConfig::api_call(),
            "Message translation",
            || async {
                let response = self
                    .client
                    .post(&self.api_url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                    .context("Failed to send translation request to OpenAI API")?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
                    anyhow::bail!("OpenAI API error during translation ({}): {}", status, body);
                }

                let chat_response: ChatResponse = response
                    .json()
                    .await
                    .context("Failed to parse OpenAI translation response")?;

                chat_response
                    .choices
                    .first()
                    .map(|c| c.message.content.trim().to_string())
                    .context("OpenAI translation response contained no choices")
            },
            is_retryable_error,
        )
        .await?;

        // The model echoes English input back; treat that as "no translation"
        if translated == text.trim() {
            return Ok(None);
        }
        Ok(Some(translated))
    }
}

#[async_trait]
impl Translate for OpenAiTranslator {
    async fn translate(&self, text: &str) -> Result<Option<String>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if is_link_only(text) {
            debug!("message is a bare link, skipping");
            return Ok(None);
        }

        let segments = split_links(text);
        let mut out = Vec::with_capacity(segments.len());
        let mut translated_any = false;

        for segment in &segments {
            match segment {
                Segment::Link(link) => out.push(link.to_string()),
                Segment::Text(part) => {
                    if part.trim().is_empty() {
                        out.push(part.to_string());
                        continue;
                    }
                    match self.translate_segment(part).await? {
                        Some(translated) => {
                            translated_any = true;
                            out.push(translated);
                        }
                        // English segment: drop it, matching whole-message
                        // skip semantics when nothing ends up translated
                        None => {}
                    }
                }
            }
        }

        if !translated_any {
            return Ok(None);
        }
        Ok(Some(out.concat()))
    }
}

/// Determine if an error is retryable (5xx, 429 rate limit, network errors).
/// Other 4xx client errors are not retried.
fn is_retryable_error(error: &anyhow::Error) -> bool {
    let error_str = error.to_string();

    if error_str.contains("OpenAI API error") {
        if let Some(start) = error_str.find('(') {
            if let Some(end) = error_str[start..].find(')') {
                let status_str = &error_str[start + 1..start + end];
                let status_num = status_str.split_whitespace().next().unwrap_or("");
                if let Ok(status) = status_num.parse::<u16>() {
                    return status == 429 || status >= 500;
                }
            }
        }
    }

    // Network errors, timeouts, and parse failures may be transient
    true
}

// === Pre-filters ===

/// Short function words and chat slang. A message made mostly of these is
/// taken as English without burning an API call or risking a misdetection.
const COMMON_ENGLISH_WORDS: &[&str] = &[
    "hello", "hi", "hey", "bye", "ok", "yes", "no", "thanks", "please", "lol", "lmao", "good",
    "bad", "nice", "cool", "awesome", "great", "wow", "omg", "wtf", "idk", "what", "when", "where",
    "why", "how", "who", "this", "that", "these", "those", "the", "and", "for", "are", "but",
    "not", "you", "all", "can", "her", "was", "one", "our", "out", "day", "get", "has", "him",
    "his", "its", "may", "new", "now", "old", "see", "two", "way", "boy", "did", "didnt", "let",
    "put", "say", "she", "too", "use",
];

fn looks_like_english(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    if words.is_empty() {
        return false;
    }
    let hits = words
        .iter()
        .filter(|w| COMMON_ENGLISH_WORDS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
        .count();
    hits as f64 / words.len() as f64 > 0.6
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"https?://[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_\+.~#?&/=]*",
        )
        .expect("URL regex is valid")
    })
}

/// True when the whole message is a single URL (nothing to translate).
pub fn is_link_only(text: &str) -> bool {
    let text = text.trim();
    url_regex()
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

#[derive(Debug, PartialEq)]
enum Segment<'a> {
    Text(&'a str),
    Link(&'a str),
}

/// Split a message into text and link segments, preserving order.
fn split_links(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last_end = 0;

    for m in url_regex().find_iter(text) {
        if last_end < m.start() {
            segments.push(Segment::Text(&text[last_end..m.start()]));
        }
        segments.push(Segment::Link(m.as_str()));
        last_end = m.end();
    }
    if last_end < text.len() {
        segments.push(Segment::Text(&text[last_end..]));
    }
    segments
}
