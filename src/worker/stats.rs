//! Pipeline counters.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::sync::Notify;

/// Lifetime counters for one pipeline.
#[derive(Debug, Default)]
pub struct PipelineStats {
    enqueued: AtomicUsize,
    rejected: AtomicUsize,
    delivered: AtomicUsize,
    failed: AtomicUsize,
    finished: Notify,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub enqueued: usize,
    pub rejected: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl StatsSnapshot {
    /// Tasks that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.delivered + self.failed
    }
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.finished.notify_waiters();
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.finished.notify_waiters();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            enqueued: self.enqueued.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            delivered: self.delivered.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
        }
    }

    /// Number of tasks that reached a terminal state.
    pub fn finished(&self) -> usize {
        self.snapshot().finished()
    }

    /// Wait until at least `count` tasks have finished.
    pub async fn wait_finished(&self, count: usize) {
        loop {
            let notified = self.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.finished() >= count {
                return;
            }
            notified.await;
        }
    }
}
