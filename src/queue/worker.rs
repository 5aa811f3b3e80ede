use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::controller::Shared;
use super::job::OutboundMessage;

/// How long one idle poll of the store waits. Pause and stop are cooperative:
/// the loop notices a cleared run flag only after this timeout elapses or the
/// current job finishes, so this bounds how stale the flag can get while idle.
pub(super) const POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// The single sequential worker loop.
///
/// Each job is fully completed (translated and handed to the dispatch bridge)
/// before the next one is fetched. That sequencing, not anything about the
/// translation API, is what keeps publishes in arrival order even when
/// per-call latency varies wildly.
///
/// The rate-limit sleep follows every job that produced output. Whether it
/// also follows skipped or failed jobs is controlled by `delay_after_skip`;
/// the default is no delay, so untranslatable messages drain quickly.
pub(super) async fn run(shared: Arc<Shared>, stop: Arc<std::sync::atomic::AtomicBool>) {
    info!("translation worker started");

    while !stop.load(Ordering::Acquire) {
        // Timeout here is the normal idle path; loop back and re-check the flag
        let Some(job) = shared.store.dequeue(POLL_TIMEOUT).await else {
            continue;
        };

        // A pause that landed while we were blocked in dequeue must not let
        // this job through; hand it back unprocessed
        if stop.load(Ordering::Acquire) {
            shared.store.requeue_front(job);
            break;
        }

        debug!(
            author = %job.payload.author_name,
            queued_for = ?job.enqueued_at.elapsed(),
            "processing message"
        );

        match shared.translator.translate(&job.payload.content).await {
            Ok(Some(text)) => {
                let outbound = OutboundMessage::new(&job.payload, text);
                if shared.outbound.send(outbound).is_err() {
                    warn!("publisher channel closed, dropping translated message");
                }
                sleep(shared.rate_limit()).await;
            }
            Ok(None) => {
                debug!(
                    author = %job.payload.author_name,
                    "no translation needed, skipping"
                );
                if shared.delay_after_skip {
                    sleep(shared.rate_limit()).await;
                }
            }
            Err(e) => {
                // A single bad job never takes the loop down
                warn!(
                    author = %job.payload.author_name,
                    "translation failed, dropping message: {e:#}"
                );
                if shared.delay_after_skip {
                    sleep(shared.rate_limit()).await;
                }
            }
        }
    }

    info!("translation worker stopped");
}
