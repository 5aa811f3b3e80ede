use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use chat_translation_relay::bridge;
use chat_translation_relay::config::Config;
use chat_translation_relay::publisher::HttpPublisher;
use chat_translation_relay::queue::TranslationQueue;
use chat_translation_relay::server::{self, AppState};
use chat_translation_relay::settings::SettingsStore;
use chat_translation_relay::translator::OpenAiTranslator;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chat_translation_relay=info".parse()?),
        )
        .init();

    info!("Starting chat translation relay");

    // Load configuration from environment
    let config = Config::from_env()?;

    // Persisted queue settings override the configured default
    let settings = SettingsStore::new(&config.settings_file);
    let rate_limit = settings
        .load_rate_limit()
        .unwrap_or(config.rate_limit_default);
    info!("Rate-limit delay: {rate_limit:?}");

    let client = reqwest::Client::new();
    let translator = Arc::new(OpenAiTranslator::new(client.clone(), &config));
    let publisher = Arc::new(HttpPublisher::new(client, &config));

    let (outbound, _publisher_task) = bridge::spawn_publisher(publisher);

    let queue = TranslationQueue::new(
        translator,
        outbound,
        settings,
        chat_translation_relay::queue::QueueOptions {
            rate_limit,
            rate_limit_min: config.rate_limit_min,
            rate_limit_max: config.rate_limit_max,
            delay_after_skip: config.delay_after_skip,
        },
    );

    let state = AppState {
        queue,
        api_key: config.api_key.clone(),
    };

    server::serve(state, config.port).await
}
