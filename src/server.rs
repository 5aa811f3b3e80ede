//! HTTP surface: message ingestion plus the operator controls.
//!
//! Ingestion (`POST /messages`) receives messages that already passed
//! channel eligibility filtering upstream, carrying their destination
//! channel. The operator endpoints drive the queue's lifecycle and settings.
//! All routes require the `x-api-key` header when an API key is configured.

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::queue::{MessagePayload, TranslationQueue};
use crate::security::constant_time_compare;

#[derive(Clone)]
pub struct AppState {
    pub queue: TranslationQueue,
    pub api_key: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/messages", post(ingest_message))
        .route("/queue/status", get(queue_status))
        .route("/queue/peek", get(queue_peek))
        .route("/queue/pause", post(queue_pause))
        .route("/queue/resume", post(queue_resume))
        .route("/queue/clear", post(queue_clear))
        .route("/queue/rate-limit", put(set_rate_limit))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.api_key else {
        return next.run(request).await;
    };
    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !constant_time_compare(provided, expected) {
        return (StatusCode::UNAUTHORIZED, "invalid or missing API key").into_response();
    }
    next.run(request).await
}

#[derive(Debug, Serialize)]
struct EnqueueResponse {
    queued: usize,
}

async fn ingest_message(
    State(state): State<AppState>,
    Json(payload): Json<MessagePayload>,
) -> impl IntoResponse {
    state.queue.enqueue(payload).await;
    let queued = state.queue.status().await.size;
    (StatusCode::ACCEPTED, Json(EnqueueResponse { queued }))
}

async fn queue_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.queue.status().await)
}

#[derive(Debug, Deserialize)]
struct PeekParams {
    #[serde(default = "default_peek_limit")]
    limit: usize,
}

fn default_peek_limit() -> usize {
    10
}

async fn queue_peek(
    State(state): State<AppState>,
    Query(params): Query<PeekParams>,
) -> impl IntoResponse {
    Json(state.queue.peek(params.limit))
}

async fn queue_pause(State(state): State<AppState>) -> impl IntoResponse {
    state.queue.pause().await;
    Json(state.queue.status().await)
}

async fn queue_resume(State(state): State<AppState>) -> impl IntoResponse {
    state.queue.resume().await;
    Json(state.queue.status().await)
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    cleared: usize,
}

async fn queue_clear(State(state): State<AppState>) -> impl IntoResponse {
    let cleared = state.queue.clear();
    Json(ClearResponse { cleared })
}

#[derive(Debug, Deserialize)]
struct RateLimitRequest {
    delay_ms: u64,
}

async fn set_rate_limit(
    State(state): State<AppState>,
    Json(body): Json<RateLimitRequest>,
) -> Response {
    match state
        .queue
        .set_rate_limit(Duration::from_millis(body.delay_ms))
    {
        Ok(()) => Json(state.queue.status().await).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

/// Bind and serve until the process is told to shut down.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
