//! The ordered translation queue.
//!
//! Messages are processed strictly in arrival order by a single worker task,
//! regardless of how long each translation call takes: a job is fully
//! finished (translated and handed to the dispatch bridge) before the next
//! one is fetched. The controller exposes the operator surface (pause,
//! resume, clear, inspect, rate limit) without breaking that guarantee.

mod controller;
mod job;
mod store;
mod worker;

pub use controller::{QueueOptions, QueueStatus, RateLimitError, TranslationQueue, WorkerState};
pub use job::{Job, MessagePayload, OutboundMessage};
pub use store::{JobPreview, QueueStore};
