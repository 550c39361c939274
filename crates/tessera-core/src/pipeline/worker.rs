//! Fixed-size pool of decode workers sharing one task source.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::types::ImageRecord;

use super::channel::{SharedReceiver, TrackedTask};
use super::processor::{log_skipped, ImageProcessor};

/// Per-worker counters, summed by [`WorkerPool::join`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64,
    pub images: u64,
    pub skipped: u64,
}

impl std::ops::AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.images += other.images;
        self.skipped += other.skipped;
    }
}

/// Handles to the running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl WorkerPool {
    /// Spawn `size` workers onto the current Tokio runtime.
    ///
    /// Workers stop once `tasks` is closed and empty. Each worker holds a clone
    /// of `results`; the result stream closes when the last one exits.
    pub fn spawn(
        size: usize,
        tasks: SharedReceiver<TrackedTask>,
        results: mpsc::Sender<ImageRecord>,
        processor: Arc<ImageProcessor>,
        span: &tracing::Span,
    ) -> Self {
        let handles = (0..size)
            .map(|id| {
                let worker = run_worker(id, tasks.clone(), results.clone(), Arc::clone(&processor));
                tokio::spawn(worker.instrument(span.clone()))
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit and sum their counters.
    pub async fn join(self) -> WorkerStats {
        let mut total = WorkerStats::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => total += stats,
                Err(e) => tracing::error!("Worker task panicked: {e}"),
            }
        }
        total
    }
}

async fn run_worker(
    id: usize,
    tasks: SharedReceiver<TrackedTask>,
    results: mpsc::Sender<ImageRecord>,
    processor: Arc<ImageProcessor>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();

    while let Some(TrackedTask { task, ticket }) = tasks.recv().await {
        stats.processed += 1;
        match processor.process(&task).await {
            Ok(record) => {
                if results.send(record).await.is_ok() {
                    stats.images += 1;
                } else {
                    tracing::debug!(
                        path = %task.path.display(),
                        "Result stream closed, record dropped"
                    );
                }
            }
            Err(e) => {
                stats.skipped += 1;
                log_skipped(&task.path, &e);
            }
        }
        // The record, if any, is already in the result stream.
        drop(ticket);
    }

    tracing::trace!(worker = id, processed = stats.processed, "Worker done");
    stats
}
