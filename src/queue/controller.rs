use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::settings::SettingsStore;
use crate::translator::Translate;

use super::job::{Job, MessagePayload, OutboundMessage};
use super::store::{JobPreview, QueueStore};
use super::worker;

/// Lifecycle of the worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Stopped,
    Running,
    Paused,
}

/// Read-only snapshot for the operator surface. Each field is individually
/// consistent; the snapshot as a whole is not atomic.
#[derive(Debug, Clone, Serialize)]
pub struct QueueStatus {
    pub size: usize,
    pub state: WorkerState,
    pub rate_limit_ms: u64,
}

#[derive(Debug, thiserror::Error)]
#[error("rate-limit delay {got:?} outside allowed range [{min:?}, {max:?}]")]
pub struct RateLimitError {
    pub got: Duration,
    pub min: Duration,
    pub max: Duration,
}

/// Tuning knobs fixed at construction. The rate-limit bounds are deployment
/// policy; only the delay itself is mutable at runtime.
#[derive(Debug, Clone)]
pub struct QueueOptions {
    pub rate_limit: Duration,
    pub rate_limit_min: Duration,
    pub rate_limit_max: Duration,
    pub delay_after_skip: bool,
}

/// State shared between the controller and the worker task.
pub(super) struct Shared {
    pub(super) store: QueueStore,
    pub(super) translator: Arc<dyn Translate>,
    pub(super) outbound: mpsc::UnboundedSender<OutboundMessage>,
    pub(super) delay_after_skip: bool,
    rate_limit_ms: AtomicU64,
}

impl Shared {
    pub(super) fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms.load(Ordering::Relaxed))
    }
}

/// Slot for the one worker task this queue is ever allowed to have. Every
/// state transition and every spawn goes through the slot's mutex, which is
/// what makes check-and-start atomic under concurrent enqueues.
struct WorkerSlot {
    state: WorkerState,
    handle: Option<JoinHandle<()>>,
    stop: Option<Arc<AtomicBool>>,
}

/// The ordered translation queue: FIFO store, single worker, and the
/// operator controls, behind one cloneable handle.
#[derive(Clone)]
pub struct TranslationQueue {
    shared: Arc<Shared>,
    slot: Arc<Mutex<WorkerSlot>>,
    settings: Arc<SettingsStore>,
    rate_limit_min: Duration,
    rate_limit_max: Duration,
}

impl TranslationQueue {
    pub fn new(
        translator: Arc<dyn Translate>,
        outbound: mpsc::UnboundedSender<OutboundMessage>,
        settings: SettingsStore,
        opts: QueueOptions,
    ) -> Self {
        let initial = opts
            .rate_limit
            .clamp(opts.rate_limit_min, opts.rate_limit_max);
        Self {
            shared: Arc::new(Shared {
                store: QueueStore::new(),
                translator,
                outbound,
                delay_after_skip: opts.delay_after_skip,
                rate_limit_ms: AtomicU64::new(initial.as_millis() as u64),
            }),
            slot: Arc::new(Mutex::new(WorkerSlot {
                state: WorkerState::Stopped,
                handle: None,
                stop: None,
            })),
            settings: Arc::new(settings),
            rate_limit_min: opts.rate_limit_min,
            rate_limit_max: opts.rate_limit_max,
        }
    }

    /// Append a message to the queue, lazily starting the worker if it is
    /// stopped. A paused queue accumulates jobs without starting anything;
    /// only `resume` (or `start`) wakes it again.
    pub async fn enqueue(&self, payload: MessagePayload) {
        self.shared.store.enqueue(Job::new(payload));

        let mut slot = self.slot.lock().await;
        match slot.state {
            WorkerState::Running => {
                let alive = slot.handle.as_ref().is_some_and(|h| !h.is_finished());
                if !alive {
                    self.spawn_worker(&mut slot).await;
                }
            }
            WorkerState::Stopped => self.spawn_worker(&mut slot).await,
            WorkerState::Paused => {}
        }
    }

    /// Start the worker if it is not already alive. Idempotent.
    pub async fn start(&self) {
        let mut slot = self.slot.lock().await;
        let alive = slot.handle.as_ref().is_some_and(|h| !h.is_finished());
        if slot.state == WorkerState::Running && alive {
            return;
        }
        self.spawn_worker(&mut slot).await;
    }

    /// Stop fetching new jobs. The in-flight job, if any, still completes and
    /// is still published. Idempotent.
    pub async fn pause(&self) {
        let mut slot = self.slot.lock().await;
        if slot.state == WorkerState::Paused {
            return;
        }
        if let Some(stop) = &slot.stop {
            stop.store(true, Ordering::Release);
        }
        slot.state = WorkerState::Paused;
        info!("translation queue paused");
    }

    /// Resume processing after a pause. Idempotent.
    pub async fn resume(&self) {
        self.start().await;
    }

    /// Stop the worker and wait for it to finish its current job.
    pub async fn stop(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(stop) = slot.stop.take() {
            stop.store(true, Ordering::Release);
        }
        if let Some(handle) = slot.handle.take() {
            let _ = handle.await;
        }
        slot.state = WorkerState::Stopped;
    }

    /// Drop all pending jobs, returning how many were dropped. A job already
    /// fetched by the worker is unaffected.
    pub fn clear(&self) -> usize {
        let cleared = self.shared.store.drain();
        info!("cleared {cleared} pending jobs from translation queue");
        cleared
    }

    /// Update the inter-job delay, persisting it to the settings file. The
    /// new value takes effect on the worker's next sleep. A persistence
    /// failure keeps the in-memory value and is not an error.
    pub fn set_rate_limit(&self, delay: Duration) -> Result<(), RateLimitError> {
        if delay < self.rate_limit_min || delay > self.rate_limit_max {
            return Err(RateLimitError {
                got: delay,
                min: self.rate_limit_min,
                max: self.rate_limit_max,
            });
        }
        self.shared
            .rate_limit_ms
            .store(delay.as_millis() as u64, Ordering::Relaxed);
        if let Err(e) = self.settings.save_rate_limit(delay) {
            warn!("failed to persist rate-limit delay, keeping in-memory value: {e:#}");
        }
        info!("rate-limit delay set to {delay:?}");
        Ok(())
    }

    pub fn rate_limit(&self) -> Duration {
        self.shared.rate_limit()
    }

    pub async fn status(&self) -> QueueStatus {
        let slot = self.slot.lock().await;
        let state = match slot.state {
            // A worker that died out from under us reads as stopped
            WorkerState::Running
                if !slot.handle.as_ref().is_some_and(|h| !h.is_finished()) =>
            {
                WorkerState::Stopped
            }
            state => state,
        };
        QueueStatus {
            size: self.shared.store.len(),
            state,
            rate_limit_ms: self.shared.rate_limit().as_millis() as u64,
        }
    }

    /// Non-destructive preview of the head of the queue.
    pub fn peek(&self, limit: usize) -> Vec<JobPreview> {
        self.shared.store.snapshot(limit)
    }

    /// Replace the worker task. Caller holds the slot lock, so no two spawns
    /// can race; awaiting the previous handle first guarantees the old worker
    /// has fully finished its in-flight job before the new one fetches.
    async fn spawn_worker(&self, slot: &mut WorkerSlot) {
        if let Some(stop) = slot.stop.take() {
            stop.store(true, Ordering::Release);
        }
        if let Some(handle) = slot.handle.take() {
            let _ = handle.await;
        }
        let stop = Arc::new(AtomicBool::new(false));
        slot.stop = Some(Arc::clone(&stop));
        slot.handle = Some(tokio::spawn(worker::run(Arc::clone(&self.shared), stop)));
        slot.state = WorkerState::Running;
    }
}
