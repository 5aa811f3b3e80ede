//! Chat translation relay.
//!
//! Ingests chat messages, translates the ones that need it, and republishes
//! them to another channel in original arrival order. The heart of the crate
//! is [`queue::TranslationQueue`]: a strict-FIFO, single-worker queue with a
//! configurable inter-job rate limit and operator controls.

pub mod bridge;
pub mod config;
pub mod publisher;
pub mod queue;
pub mod retry;
pub mod security;
pub mod server;
pub mod settings;
pub mod translator;
