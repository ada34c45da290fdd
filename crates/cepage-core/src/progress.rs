//! Progress reporting collaborator.
//!
//! The dispatcher maintains a monotonically increasing completion counter
//! (atomic, incremented exactly once per terminal item regardless of
//! success or failure) and forwards each tick to a [`ProgressSink`].  The
//! sink keeps any concrete progress-bar implementation out of this crate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives progress ticks from a running batch.
pub trait ProgressSink: Send + Sync {
    /// Called once when the batch starts, with the total item count.
    fn batch_started(&self, _total: usize) {}

    /// Called exactly once per completed item.  `completed` is monotone,
    /// starting at 1 and ending at the batch total.
    fn item_done(&self, completed: u64);

    /// Called once after every item has a terminal result.
    fn batch_finished(&self) {}
}

/// Discards all progress ticks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn item_done(&self, _completed: u64) {}
}

/// Presents several consecutive sub-batches to an inner sink as one batch.
///
/// Announces the overall total once, on construction; the per-sub-batch
/// `batch_started` calls are absorbed, and ticks continue from where the
/// previous sub-batch ended instead of restarting at 1.  The caller signals
/// the true end with [`finish`](Self::finish) after the last sub-batch.
pub struct ChunkedProgress {
    inner: Arc<dyn ProgressSink>,
    base: AtomicU64,
    chunk_peak: AtomicU64,
}

impl ChunkedProgress {
    pub fn new(inner: Arc<dyn ProgressSink>, total: usize) -> Self {
        inner.batch_started(total);
        Self { inner, base: AtomicU64::new(0), chunk_peak: AtomicU64::new(0) }
    }

    /// Forward the terminal notification once every sub-batch has run.
    pub fn finish(&self) {
        self.inner.batch_finished();
    }
}

impl ProgressSink for ChunkedProgress {
    fn batch_started(&self, _total: usize) {}

    fn item_done(&self, completed: u64) {
        self.chunk_peak.fetch_max(completed, Ordering::SeqCst);
        self.inner.item_done(self.base.load(Ordering::SeqCst) + completed);
    }

    fn batch_finished(&self) {
        // A finished sub-batch's highest tick equals its item count.
        let peak = self.chunk_peak.swap(0, Ordering::SeqCst);
        self.base.fetch_add(peak, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording {
        started: Mutex<Vec<usize>>,
        ticks: Mutex<Vec<u64>>,
        finished: AtomicU64,
    }

    impl ProgressSink for Recording {
        fn batch_started(&self, total: usize) {
            self.started.lock().push(total);
        }

        fn item_done(&self, completed: u64) {
            self.ticks.lock().push(completed);
        }

        fn batch_finished(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sub_batches_continue_one_overall_count() {
        let inner = Arc::new(Recording::default());
        let overall = ChunkedProgress::new(Arc::clone(&inner) as Arc<dyn ProgressSink>, 5);

        // Sub-batch of 3, then a sub-batch of 2.
        overall.batch_started(3);
        for i in 1..=3 {
            overall.item_done(i);
        }
        overall.batch_finished();

        overall.batch_started(2);
        for i in 1..=2 {
            overall.item_done(i);
        }
        overall.batch_finished();
        overall.finish();

        // The inner sink saw one batch of 5, never a restart.
        assert_eq!(*inner.started.lock(), vec![5]);
        assert_eq!(*inner.ticks.lock(), vec![1, 2, 3, 4, 5]);
        assert_eq!(inner.finished.load(Ordering::SeqCst), 1);
    }
}
