//! Bounded channels for backpressure between walker, workers and caller.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::config::PipelineConfig;
use crate::types::FileTask;

use super::tracker::Ticket;

/// A task in flight, paired with the ticket that completes it when dropped.
#[derive(Debug)]
pub struct TrackedTask {
    pub task: FileTask,
    pub ticket: Ticket,
}

/// Create a bounded channel pair with the configured buffer size.
///
/// When the buffer is full, the sender waits, which keeps the walker from
/// racing arbitrarily far ahead of the workers.
pub fn bounded_channel<T>(config: &PipelineConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.buffer_size)
}

/// A receiver shared by several consumers; each item goes to exactly one.
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedReceiver<T> {
    pub fn new(rx: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rx)),
        }
    }

    /// Receive the next item, or `None` once every sender is gone and the
    /// buffer is empty.
    pub async fn recv(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}
