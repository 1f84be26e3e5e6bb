//! Bounded work queue shared between the producer and the worker pool
//!
//! Built on a bounded mpsc channel with the receiver behind an async mutex so
//! any worker can dequeue. Delivery is exactly-once; order is whatever the
//! channel gives us, which the pipeline does not rely on.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// A discovered listing awaiting extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Detail-page URL
    pub url: String,

    /// Best-effort type classifier from the listing card
    pub type_hint: String,
}

/// Queue entries: real work, or the end-of-work sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEntry {
    Job(WorkItem),
    /// One per worker at end of discovery; never forwarded by a worker
    Stop,
}

/// Error returned when the queue has shut down
#[derive(Debug, thiserror::Error)]
#[error("work queue is closed")]
pub struct QueueClosed;

/// Bounded multi-producer multi-consumer work queue
#[derive(Clone)]
pub struct WorkQueue {
    tx: mpsc::Sender<QueueEntry>,
    rx: Arc<Mutex<mpsc::Receiver<QueueEntry>>>,
}

impl WorkQueue {
    /// Creates a queue holding at most `capacity` entries
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Enqueues an entry, waiting for space if the queue is full.
    ///
    /// This is the producer backpressure point: a full queue blocks discovery
    /// until a worker drains an item.
    pub async fn enqueue(&self, entry: QueueEntry) -> Result<(), QueueClosed> {
        self.tx.send(entry).await.map_err(|_| QueueClosed)
    }

    /// Dequeues the next entry, or returns None after `timeout`.
    ///
    /// A timeout is not an error; it gives idle workers a chance to re-check
    /// the cancellation flag.
    pub async fn dequeue(&self, timeout: Duration) -> Option<QueueEntry> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(entry) => entry,
            Err(_) => None,
        }
    }
}
