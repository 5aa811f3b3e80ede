use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use super::job::Job;

/// Thread-safe FIFO of pending jobs.
///
/// Insertion order is processing order: no re-ordering, no deduplication.
/// `enqueue` may be called from any task concurrently with the worker's
/// `dequeue`; the mutex is only ever held for O(1) operations (plus the
/// bounded copy in `snapshot`), never across an await point.
#[derive(Debug, Default)]
pub struct QueueStore {
    jobs: Mutex<VecDeque<Job>>,
    notify: Notify,
}

/// Non-destructive view of one queued job, for the inspect control.
#[derive(Debug, Clone, Serialize)]
pub struct JobPreview {
    pub author_name: String,
    pub content_preview: String,
    pub waiting_secs: f64,
}

const PREVIEW_CHARS: usize = 50;

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job to the tail. Never blocks.
    pub fn enqueue(&self, job: Job) {
        self.jobs.lock().unwrap().push_back(job);
        // A stored permit covers the push-before-wait race
        self.notify.notify_one();
    }

    /// Remove and return the head, waiting up to `timeout` if the queue is
    /// empty. `None` on timeout is the normal idle outcome, not an error.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Job> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for notification before checking, so an enqueue that
            // lands between the check and the wait is not missed.
            let notified = self.notify.notified();
            if let Some(job) = self.pop_front() {
                return Some(job);
            }
            match timeout_at(deadline, notified).await {
                Ok(()) => continue,
                Err(_) => return self.pop_front(),
            }
        }
    }

    /// Put a job back at the head of the queue. Used by the worker when a
    /// pause lands between its dequeue and the start of processing, so the
    /// job is neither lost nor reordered.
    pub fn requeue_front(&self, job: Job) {
        self.jobs.lock().unwrap().push_front(job);
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().unwrap().is_empty()
    }

    /// Remove and discard all pending jobs, returning how many were dropped.
    /// Atomic with respect to concurrent enqueue/dequeue.
    pub fn drain(&self) -> usize {
        let mut jobs = self.jobs.lock().unwrap();
        let cleared = jobs.len();
        jobs.clear();
        cleared
    }

    /// Snapshot the first `limit` jobs without removing them.
    pub fn snapshot(&self, limit: usize) -> Vec<JobPreview> {
        let jobs = self.jobs.lock().unwrap();
        jobs.iter()
            .take(limit)
            .map(|job| JobPreview {
                author_name: job.payload.author_name.clone(),
                content_preview: truncate_chars(&job.payload.content, PREVIEW_CHARS),
                waiting_secs: job.enqueued_at.elapsed().as_secs_f64(),
            })
            .collect()
    }

    fn pop_front(&self) -> Option<Job> {
        self.jobs.lock().unwrap().pop_front()
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MessagePayload;
    use std::sync::Arc;

    fn job(content: &str) -> Job {
        Job::new(MessagePayload {
            content: content.to_string(),
            author_name: "alice".to_string(),
            avatar_url: None,
            sent_at: chrono::Utc::now(),
            target_channel_id: "chan-1".to_string(),
        })
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let store = QueueStore::new();
        for text in ["first", "second", "third"] {
            store.enqueue(job(text));
        }

        for expected in ["first", "second", "third"] {
            let got = store.dequeue(Duration::from_millis(100)).await.unwrap();
            assert_eq!(got.payload.content, expected);
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_dequeue_empty_times_out() {
        let store = QueueStore::new();
        let start = std::time::Instant::now();
        assert!(store.dequeue(Duration::from_millis(50)).await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_dequeue_wakes_on_enqueue() {
        let store = Arc::new(QueueStore::new());

        let consumer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.dequeue(Duration::from_secs(5)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        store.enqueue(job("wake up"));

        let got = consumer.await.unwrap().expect("should receive the job");
        assert_eq!(got.payload.content, "wake up");
    }

    #[tokio::test]
    async fn test_drain_returns_count_and_empties() {
        let store = QueueStore::new();
        for i in 0..5 {
            store.enqueue(job(&format!("msg {i}")));
        }

        assert_eq!(store.drain(), 5);
        assert_eq!(store.len(), 0);
        assert_eq!(store.drain(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_loses_nothing() {
        let store = Arc::new(QueueStore::new());

        let producers: Vec<_> = (0..8)
            .map(|p| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    for i in 0..25 {
                        store.enqueue(job(&format!("p{p}-{i}")));
                    }
                })
            })
            .collect();
        futures::future::join_all(producers).await;

        assert_eq!(store.len(), 200);
        let mut seen = 0;
        while store.dequeue(Duration::from_millis(10)).await.is_some() {
            seen += 1;
        }
        assert_eq!(seen, 200);
    }

    #[tokio::test]
    async fn test_single_producer_order_survives_concurrent_consumer() {
        let store = Arc::new(QueueStore::new());

        let consumer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let mut got = Vec::new();
                while got.len() < 50 {
                    if let Some(job) = store.dequeue(Duration::from_millis(200)).await {
                        got.push(job.payload.content);
                    }
                }
                got
            })
        };

        for i in 0..50 {
            store.enqueue(job(&i.to_string()));
            if i % 10 == 0 {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }

        let got = consumer.await.unwrap();
        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn test_requeue_front_restores_head_position() {
        let store = QueueStore::new();
        store.enqueue(job("first"));
        store.enqueue(job("second"));

        let head = store.dequeue(Duration::from_millis(50)).await.unwrap();
        assert_eq!(head.payload.content, "first");
        store.requeue_front(head);

        let head_again = store.dequeue(Duration::from_millis(50)).await.unwrap();
        assert_eq!(head_again.payload.content, "first");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_snapshot_previews_head_without_removal() {
        let store = QueueStore::new();
        store.enqueue(job(&"x".repeat(80)));
        store.enqueue(job("short"));
        store.enqueue(job("tail"));

        let preview = store.snapshot(2);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].content_preview.chars().count(), 53); // 50 + "..."
        assert_eq!(preview[1].content_preview, "short");
        assert_eq!(store.len(), 3);
    }
}
