//! Pipeline orchestration: walker → worker pool → result stream.
//!
//! ```text
//! DirectoryWalker ──tasks──▶ WorkerPool (P workers) ──records──▶ caller
//!        │ begin()                  │ drop(ticket)
//!        └──────▶ CompletionTracker ◀┘
//! ```
//!
//! Workers are running before the walk starts. Once the tracker drains, the
//! orchestrator releases its result sender and joins the workers, which
//! closes the result stream.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::types::{ImageRecord, ScanSummary};

use super::channel::{bounded_channel, SharedReceiver};
use super::decode::ImageDecoder;
use super::discovery::{DirectoryWalker, WalkStats};
use super::processor::ImageProcessor;
use super::tracker::CompletionTracker;
use super::worker::WorkerPool;

/// Every record found by a scan, plus its statistics.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub records: Vec<ImageRecord>,
    pub summary: ScanSummary,
}

/// A scan in progress.
///
/// Drain [`ScanHandle::next`] until it returns `None`, then call
/// [`ScanHandle::finish`] for the summary.
pub struct ScanHandle {
    records: mpsc::Receiver<ImageRecord>,
    driver: JoinHandle<ScanSummary>,
}

impl ScanHandle {
    /// Next record, in completion order. `None` once the scan is done.
    pub async fn next(&mut self) -> Option<ImageRecord> {
        self.records.recv().await
    }

    /// Wait for the scan to wind down and return its summary.
    ///
    /// Records not yet received are discarded.
    pub async fn finish(self) -> Result<ScanSummary> {
        let ScanHandle { records, driver } = self;
        // Unblock any worker still waiting on a full result channel.
        drop(records);
        Ok(driver.await?)
    }
}

/// Scans directory trees for decodable images.
pub struct Scanner {
    config: Config,
    processor: Arc<ImageProcessor>,
}

impl Scanner {
    /// Create a scanner with the default codec set.
    ///
    /// `config` must already be validated; [`Config::load`] and
    /// [`Config::from_toml`] do that. A pool of zero workers never drains.
    pub fn new(config: Config) -> Self {
        Self::with_decoder(config, ImageDecoder::default())
    }

    /// Create a scanner with a custom codec registry.
    pub fn with_decoder(config: Config, decoder: ImageDecoder) -> Self {
        let processor = Arc::new(ImageProcessor::with_decoder(
            decoder,
            config.limits.clone(),
        ));
        Self { config, processor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan `root` and collect every record.
    ///
    /// Fails only if `root` cannot be read as a directory. Files that cannot
    /// be opened or decoded are skipped and show up as `summary.skipped`.
    pub async fn scan(&self, root: &Path) -> Result<ScanReport> {
        let mut handle = self.scan_stream(root)?;
        let mut records = Vec::new();
        while let Some(record) = handle.next().await {
            records.push(record);
        }
        let summary = handle.finish().await?;
        Ok(ScanReport { records, summary })
    }

    /// Start scanning `root`, streaming records as workers produce them.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn scan_stream(&self, root: &Path) -> std::result::Result<ScanHandle, PipelineError> {
        let walker = DirectoryWalker::open(root)?;
        let workers = self.config.processing.parallel_workers;
        debug_assert!(workers > 0, "scanner built from an unvalidated config");
        let span = tracing::info_span!("scan", root = %root.display());
        span.in_scope(|| tracing::debug!(workers, "Starting scan"));

        let start = Instant::now();
        let tracker = CompletionTracker::new();
        let (task_tx, task_rx) = bounded_channel(&self.config.pipeline);
        let (result_tx, result_rx) = bounded_channel(&self.config.pipeline);

        let pool = WorkerPool::spawn(
            workers,
            SharedReceiver::new(task_rx),
            result_tx.clone(),
            Arc::clone(&self.processor),
            &span,
        );

        let walk = {
            let tracker = Arc::clone(&tracker);
            let span = span.clone();
            tokio::task::spawn_blocking(move || span.in_scope(|| walker.walk(task_tx, tracker)))
        };

        let driver = async move {
            tracker.wait_drained().await;
            drop(result_tx);
            let worker_stats = pool.join().await;
            let walk_stats = walk.await.unwrap_or_else(|e| {
                tracing::error!("Walk task failed: {e}");
                WalkStats::default()
            });

            let summary = ScanSummary {
                submitted: tracker.submitted(),
                completed: tracker.completed(),
                images: worker_stats.images,
                skipped: worker_stats.skipped,
                walk_errors: walk_stats.errors,
                drains: tracker.drain_events(),
                elapsed: start.elapsed(),
            };
            tracing::info!(
                submitted = summary.submitted,
                images = summary.images,
                skipped = summary.skipped,
                walk_errors = summary.walk_errors,
                elapsed_ms = summary.elapsed.as_millis() as u64,
                "All files processed"
            );
            summary
        };

        Ok(ScanHandle {
            records: result_rx,
            driver: tokio::spawn(driver.instrument(span)),
        })
    }
}
