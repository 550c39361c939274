//! Recursive discovery of candidate files under a root directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::error::PipelineError;
use crate::types::FileTask;

use super::channel::TrackedTask;
use super::tracker::CompletionTracker;

/// Walks a directory tree and submits one task per non-directory entry.
///
/// Symbolic links are not followed; the tree is treated as a plain tree.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
}

/// Counters from one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Tasks accepted by the task channel
    pub submitted: u64,
    /// Directories descended into
    pub directories: u64,
    /// Entries that could not be visited
    pub errors: u64,
}

/// Seals the tracker when the walk ends, even by unwinding.
struct SealOnDrop<'a>(&'a CompletionTracker);

impl Drop for SealOnDrop<'_> {
    fn drop(&mut self) {
        self.0.seal();
    }
}

impl DirectoryWalker {
    /// Open a walker rooted at `root`.
    ///
    /// Fails if the root itself cannot be read as a directory; that is the
    /// only fatal error of a scan.
    pub fn open(root: &Path) -> Result<Self, PipelineError> {
        std::fs::read_dir(root).map_err(|source| PipelineError::RootInaccessible {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree, pushing tasks into `tasks` until traversal ends.
    ///
    /// Blocking: call from a blocking thread. Each task's ticket is issued
    /// before the send, the tracker is sealed when the walk ends, and `tasks`
    /// is dropped on return, closing the task source.
    pub fn walk(
        &self,
        tasks: mpsc::Sender<TrackedTask>,
        tracker: Arc<CompletionTracker>,
    ) -> WalkStats {
        let _seal = SealOnDrop(&tracker);
        let mut stats = WalkStats::default();

        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    stats.errors += 1;
                    tracing::warn!(
                        path = ?err.path(),
                        error = %err,
                        "Failed to check entry, skipping it"
                    );
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                stats.directories += 1;
                tracing::trace!(directory = %entry.path().display(), "Descending into directory");
                continue;
            }

            let ticket = tracker.begin();
            let task = TrackedTask {
                task: FileTask::new(entry.into_path()),
                ticket,
            };
            tracing::trace!(file = %task.task.path.display(), "Submitting file for processing");

            // A rejected task is dropped here together with its ticket.
            if tasks.blocking_send(task).is_err() {
                tracing::warn!("Task channel closed before the walk finished; stopping walk");
                break;
            }
            stats.submitted += 1;
        }

        tracing::debug!(
            root = %self.root.display(),
            submitted = stats.submitted,
            directories = stats.directories,
            errors = stats.errors,
            "Walk finished"
        );
        stats
    }
}
