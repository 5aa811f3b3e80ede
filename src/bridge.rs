//! Dispatch bridge between the worker and the publishing side.
//!
//! The worker task never performs the publish itself: it pushes the finished
//! translation into an unbounded channel and moves straight on to its
//! rate-limit sleep. A dedicated publisher task owns the outbound client and
//! drains the channel in order. Publish failures (channel deleted, platform
//! down) are logged and swallowed; they never reach the worker.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::publisher::Publish;
use crate::queue::OutboundMessage;

/// Create the bridge: returns the sender handed to the queue and the
/// publisher task draining the other end. The task exits when every sender
/// is dropped.
pub fn spawn_publisher(
    publisher: Arc<dyn Publish>,
) -> (mpsc::UnboundedSender<OutboundMessage>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundMessage>();

    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            debug!(
                channel = %message.channel_id,
                author = %message.author_name,
                "publishing translated message"
            );
            if let Err(e) = publisher.publish(&message).await {
                warn!(
                    channel = %message.channel_id,
                    "failed to publish translated message: {e:#}"
                );
            }
        }
        debug!("publisher task exiting, all senders dropped");
    });

    (tx, handle)
}
