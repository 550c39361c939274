//! Completion tracking for the walk → worker fan-out.
//!
//! Every submitted task carries a [`Ticket`]. Issuing a ticket increments the
//! outstanding count and dropping it decrements the count, so each task is
//! released exactly once whatever happens to it (success, soft failure,
//! rejected send, or a panic unwinding through the worker).
//!
//! The tracker is *drained* once it has been sealed (no more tickets will be
//! issued) and the outstanding count is zero. The transition happens exactly
//! once per tracker.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Outstanding-task counter with a drain notification.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: AtomicU64,
    submitted: AtomicU64,
    completed: AtomicU64,
    sealed: AtomicBool,
    drained: AtomicBool,
    drain_events: AtomicU64,
    notify: Notify,
}

/// Proof that one task is outstanding. Dropping it completes the task.
#[derive(Debug)]
#[must_use = "dropping a ticket immediately completes its task"]
pub struct Ticket {
    tracker: Arc<CompletionTracker>,
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.tracker.finish_one();
    }
}

impl CompletionTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more outstanding task.
    pub fn begin(self: &Arc<Self>) -> Ticket {
        if self.sealed.load(Ordering::SeqCst) {
            tracing::warn!("Ticket issued after the tracker was sealed");
        }
        self.submitted.fetch_add(1, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ticket {
            tracker: Arc::clone(self),
        }
    }

    /// Declare that no more tickets will be issued.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
        self.try_drain();
    }

    fn finish_one(&self) {
        // Count the completion before releasing the slot so a waiter woken by
        // the drain always sees `completed == submitted`.
        self.completed.fetch_add(1, Ordering::SeqCst);
        match self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => self.try_drain(),
            Ok(_) => {}
            Err(_) => {
                self.completed.fetch_sub(1, Ordering::SeqCst);
                tracing::error!("Completion tracker would go negative; decrement ignored");
            }
        }
    }

    fn try_drain(&self) {
        if self.sealed.load(Ordering::SeqCst)
            && self.outstanding.load(Ordering::SeqCst) == 0
            && self
                .drained
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.drain_events.fetch_add(1, Ordering::SeqCst);
            tracing::trace!(
                completed = self.completed.load(Ordering::SeqCst),
                "Completion tracker drained"
            );
            self.notify.notify_waiters();
        }
    }

    /// Wait until the tracker is sealed and every ticket has been dropped.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a drain between the check and the
            // await still wakes us.
            notified.as_mut().enable();
            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::SeqCst)
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> u64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Tickets issued so far.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Tickets dropped so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// How many times the tracker transitioned to drained (0 or 1).
    pub fn drain_events(&self) -> u64 {
        self.drain_events.load(Ordering::SeqCst)
    }
}
