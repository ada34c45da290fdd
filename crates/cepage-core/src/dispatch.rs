//! Bounded-concurrency batch inference dispatcher.
//!
//! Fans an ordered sequence of [`WorkItem`]s out to an inference
//! collaborator under a fixed concurrency bound, records exactly one
//! terminal [`InferenceResult`] per item into a shared [`ResultStore`], and
//! returns a [`BatchReport`] once every item is terminal.
//!
//! Per-item state machine: `Pending → InFlight → {Succeeded, Failed}`.
//! A failed call is terminal for that item within the batch — it is logged
//! and the batch continues; there is no automatic retry.  Only orchestration
//! errors (duplicate keys, duplicate store writes) abort the run.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::error::{ClassifyError, DispatchError, DispatchResult};
use crate::item::{Failure, FailureKind, InferenceResult, Outcome, WorkItem};
use crate::labels::LabelSet;
use crate::pacing::{NoPacing, Pacer};
use crate::progress::{NullProgress, ProgressSink};
use crate::report::BatchReport;
use crate::store::ResultStore;

/// A finished batch: the aggregate report plus the keyed store that
/// downstream consumers (scoring, training-file construction) read from.
#[derive(Debug)]
pub struct BatchOutput {
    pub report: BatchReport,
    pub store: ResultStore,
}

/// Dispatches batches of classification work against an inference
/// collaborator.
#[derive(Clone)]
pub struct Dispatcher {
    concurrency: usize,
    pacer: Arc<dyn Pacer>,
    progress: Arc<dyn ProgressSink>,
    call_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher with the given worker-pool size and no pacing.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            pacer: Arc::new(NoPacing),
            progress: Arc::new(NullProgress),
            call_timeout: None,
        }
    }

    /// Inject a pacing strategy invoked by each worker between calls.
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Inject a progress collaborator.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Convert a hung call into `Failed(timeout)` after `limit`, without
    /// blocking other workers.
    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = Some(limit);
        self
    }

    /// The sink this dispatcher reports progress into.
    pub fn progress(&self) -> Arc<dyn ProgressSink> {
        Arc::clone(&self.progress)
    }

    // ── Concurrent mode ───────────────────────────────────────────────────────

    /// Run the batch with at most `concurrency` calls in flight.
    ///
    /// Workers pull items from the sequence in order; completion order across
    /// items is unspecified.  Returns only once every item has a terminal
    /// result.
    pub async fn run(
        &self,
        items: Vec<WorkItem>,
        classifier: Arc<dyn Classifier>,
        labels: &LabelSet,
    ) -> DispatchResult<BatchOutput> {
        self.validate(&items)?;

        if items.is_empty() {
            // No worker is spawned for an empty batch.
            return Ok(BatchOutput { report: BatchReport::empty(), store: ResultStore::new() });
        }

        let total = items.len();
        let workers = self.concurrency.min(total);
        self.progress.batch_started(total);
        info!(total, workers, "dispatching batch");

        let items = Arc::new(items);
        let store = Arc::new(ResultStore::new());
        let labels = Arc::new(labels.clone());
        let next = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicU64::new(0));

        let mut pool: JoinSet<DispatchResult<()>> = JoinSet::new();
        for slot in 0..workers {
            let items = Arc::clone(&items);
            let store = Arc::clone(&store);
            let labels = Arc::clone(&labels);
            let next = Arc::clone(&next);
            let completed = Arc::clone(&completed);
            let classifier = Arc::clone(&classifier);
            let pacer = Arc::clone(&self.pacer);
            let progress = Arc::clone(&self.progress);
            let call_timeout = self.call_timeout;

            pool.spawn(async move {
                loop {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    if idx >= items.len() {
                        debug!(slot, "worker drained the queue");
                        return Ok(());
                    }
                    let item = &items[idx];
                    let result =
                        classify_one(item, classifier.as_ref(), &labels, call_timeout).await;
                    store.record(result)?;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress.item_done(done);
                    pacer.pause().await;
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                // Orchestration errors abort the batch; remaining workers are
                // dropped with the JoinSet.
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(DispatchError::Worker(e.to_string())),
            }
        }

        self.progress.batch_finished();
        self.finish(items.as_slice(), &store)
    }

    // ── Sequential mode ───────────────────────────────────────────────────────

    /// Run the same contract one item at a time, in item order.
    ///
    /// Useful when strict per-item execution order must be observed (e.g.
    /// debugging).  Produces a report identical to [`Dispatcher::run`] for
    /// the same inputs and a deterministic collaborator.
    pub async fn run_sequential(
        &self,
        items: Vec<WorkItem>,
        classifier: Arc<dyn Classifier>,
        labels: &LabelSet,
    ) -> DispatchResult<BatchOutput> {
        self.validate(&items)?;

        if items.is_empty() {
            return Ok(BatchOutput { report: BatchReport::empty(), store: ResultStore::new() });
        }

        let total = items.len();
        self.progress.batch_started(total);
        info!(total, "dispatching batch sequentially");

        let store = ResultStore::new();
        let mut completed: u64 = 0;

        for item in &items {
            let result = classify_one(item, classifier.as_ref(), labels, self.call_timeout).await;
            store.record(result)?;
            completed += 1;
            self.progress.item_done(completed);
            self.pacer.pause().await;
        }

        self.progress.batch_finished();
        self.finish(&items, &store)
    }

    // ── Shared plumbing ───────────────────────────────────────────────────────

    fn validate(&self, items: &[WorkItem]) -> DispatchResult<()> {
        if self.concurrency == 0 {
            return Err(DispatchError::ZeroConcurrency);
        }
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.key.as_str()) {
                return Err(DispatchError::DuplicateKey(item.key.clone()));
            }
        }
        Ok(())
    }

    fn finish(&self, items: &[WorkItem], store: &ResultStore) -> DispatchResult<BatchOutput> {
        let report = BatchReport::from_store(items, store)?;
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "batch complete"
        );
        // Hand the store back by value; workers have all exited.
        let out = ResultStore::new();
        for result in store.snapshot() {
            out.record(result)?;
        }
        Ok(BatchOutput { report, store: out })
    }
}

/// Issue one inference call and convert the result into a terminal record.
async fn classify_one(
    item: &WorkItem,
    classifier: &dyn Classifier,
    labels: &LabelSet,
    call_timeout: Option<Duration>,
) -> InferenceResult {
    let start = Instant::now();

    let outcome = match call_timeout {
        Some(limit) => match tokio::time::timeout(limit, classifier.classify(item)).await {
            Ok(result) => outcome_from(result, labels, &item.key),
            Err(_) => {
                warn!(key = %item.key, limit_ms = limit.as_millis() as u64, "inference call timed out");
                Outcome::Failed(Failure::new(
                    FailureKind::Timeout,
                    format!("no response within {}ms", limit.as_millis()),
                ))
            }
        },
        None => outcome_from(classifier.classify(item).await, labels, &item.key),
    };

    InferenceResult {
        key: item.key.clone(),
        outcome,
        latency_ms: start.elapsed().as_millis() as u64,
        attempts: 1,
    }
}

/// Classify a collaborator return value, enforcing enumeration membership.
fn outcome_from(
    result: Result<String, ClassifyError>,
    labels: &LabelSet,
    key: &str,
) -> Outcome {
    match result {
        Ok(label) if labels.is_empty() || labels.contains(&label) => Outcome::Label(label),
        Ok(label) => {
            warn!(key, label = %label, "label outside the allowed enumeration");
            Outcome::Failed(Failure::new(
                FailureKind::Malformed,
                format!("label '{label}' is not in the allowed enumeration"),
            ))
        }
        Err(e) => {
            warn!(key, error = %e, "inference call failed");
            Outcome::Failed(Failure::from(e))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicU64;

    /// Deterministic stub: a fixed answer per key.
    struct StubClassifier {
        answers: HashMap<String, Result<String, ClassifyError>>,
        calls: AtomicUsize,
    }

    impl StubClassifier {
        fn new(answers: &[(&str, Result<&str, ClassifyError>)]) -> Arc<Self> {
            Arc::new(Self {
                answers: answers
                    .iter()
                    .map(|(k, v)| {
                        ((*k).to_string(), v.as_ref().map(|s| (*s).to_string()).map_err(Clone::clone))
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(&self, item: &WorkItem) -> Result<String, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .get(&item.key)
                .cloned()
                .unwrap_or_else(|| Err(ClassifyError::Transient("no stub answer".into())))
        }
    }

    /// Stub that never answers; used to exercise the per-call timeout.
    struct HangingClassifier;

    #[async_trait]
    impl Classifier for HangingClassifier {
        async fn classify(&self, _item: &WorkItem) -> Result<String, ClassifyError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".into())
        }
    }

    /// Pacer that counts invocations instead of sleeping.
    #[derive(Default)]
    struct CountingPacer {
        pauses: AtomicU64,
    }

    #[async_trait]
    impl Pacer for CountingPacer {
        async fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Sink that records every notification for monotonicity checks.
    #[derive(Default)]
    struct RecordingProgress {
        started: parking_lot::Mutex<Vec<usize>>,
        ticks: parking_lot::Mutex<Vec<u64>>,
    }

    impl ProgressSink for RecordingProgress {
        fn batch_started(&self, total: usize) {
            self.started.lock().push(total);
        }

        fn item_done(&self, completed: u64) {
            self.ticks.lock().push(completed);
        }
    }

    fn items(keys: &[&str]) -> Vec<WorkItem> {
        keys.iter().map(|k| WorkItem::new(*k, format!("review {k}"))).collect()
    }

    fn xy_labels() -> LabelSet {
        LabelSet::new(["X", "Y"])
    }

    // Mixed batch: A → "X", B → error, C → "Y".
    fn abc_stub() -> Arc<StubClassifier> {
        StubClassifier::new(&[
            ("A", Ok("X")),
            ("B", Err(ClassifyError::Transient("boom".into()))),
            ("C", Ok("Y")),
        ])
    }

    #[tokio::test]
    async fn mixed_batch_yields_terminal_result_per_item() {
        let out = Dispatcher::new(4)
            .run(items(&["A", "B", "C"]), abc_stub(), &xy_labels())
            .await
            .unwrap();

        assert_eq!(out.report.total, 3);
        assert_eq!(out.report.succeeded, 2);
        assert_eq!(out.report.failed, 1);
        assert_eq!(out.report.failures.len(), 1);
        assert_eq!(out.report.failures[0].key, "B");
        assert_eq!(out.store.len(), 3);
        assert_eq!(out.store.label("A").as_deref(), Some("X"));
        assert_eq!(out.store.label("C").as_deref(), Some("Y"));
        assert!(out.store.get("B").unwrap().outcome.label().is_none());
    }

    #[tokio::test]
    async fn empty_batch_returns_immediately() {
        let out = Dispatcher::new(8)
            .run(Vec::new(), abc_stub(), &LabelSet::default())
            .await
            .unwrap();
        assert_eq!(out.report, BatchReport::empty());
        assert!(out.store.is_empty());
    }

    #[tokio::test]
    async fn sequential_and_concurrent_reports_are_identical() {
        let labels = xy_labels();
        let work = items(&["A", "B", "C"]);

        let concurrent = Dispatcher::new(3)
            .run(work.clone(), abc_stub(), &labels)
            .await
            .unwrap();
        let sequential = Dispatcher::new(1)
            .run_sequential(work, abc_stub(), &labels)
            .await
            .unwrap();

        assert_eq!(concurrent.report, sequential.report);
        // Same success/failure set and same labels; latency is timing noise.
        let outcomes = |out: &BatchOutput| -> Vec<(String, Outcome)> {
            out.store.snapshot().into_iter().map(|r| (r.key, r.outcome)).collect()
        };
        assert_eq!(outcomes(&concurrent), outcomes(&sequential));
    }

    #[tokio::test]
    async fn concurrency_one_matches_sequential_mode() {
        let labels = xy_labels();
        let work = items(&["A", "B", "C"]);

        let one = Dispatcher::new(1).run(work.clone(), abc_stub(), &labels).await.unwrap();
        let seq = Dispatcher::new(1).run_sequential(work, abc_stub(), &labels).await.unwrap();
        assert_eq!(one.report, seq.report);
    }

    #[tokio::test]
    async fn concurrency_above_item_count_is_clamped() {
        let stub = abc_stub();
        let out = Dispatcher::new(64)
            .run(items(&["A", "B", "C"]), Arc::clone(&stub) as Arc<dyn Classifier>, &xy_labels())
            .await
            .unwrap();
        assert_eq!(out.report.total, 3);
        // One call per item, no duplicated work.
        assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let err = Dispatcher::new(0)
            .run(items(&["A"]), abc_stub(), &xy_labels())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ZeroConcurrency));
    }

    #[tokio::test]
    async fn duplicate_keys_are_rejected_before_any_call() {
        let stub = abc_stub();
        let err = Dispatcher::new(2)
            .run(
                items(&["A", "A"]),
                Arc::clone(&stub) as Arc<dyn Classifier>,
                &xy_labels(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateKey(k) if k == "A"));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn out_of_enumeration_label_is_recorded_as_malformed() {
        let stub = StubClassifier::new(&[("A", Ok("Zinfandel"))]);
        let out = Dispatcher::new(1)
            .run(items(&["A"]), stub, &xy_labels())
            .await
            .unwrap();

        assert_eq!(out.report.failed, 1);
        let result = out.store.get("A").unwrap();
        match result.outcome {
            Outcome::Failed(f) => assert_eq!(f.kind, FailureKind::Malformed),
            other => panic!("expected malformed failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_enumeration_accepts_any_label() {
        let stub = StubClassifier::new(&[("A", Ok("anything goes"))]);
        let out = Dispatcher::new(1)
            .run(items(&["A"]), stub, &LabelSet::default())
            .await
            .unwrap();
        assert_eq!(out.report.succeeded, 1);
    }

    #[tokio::test]
    async fn hung_call_becomes_timeout_failure() {
        let out = Dispatcher::new(1)
            .with_call_timeout(Duration::from_millis(20))
            .run(items(&["A"]), Arc::new(HangingClassifier), &xy_labels())
            .await
            .unwrap();

        let result = out.store.get("A").unwrap();
        match result.outcome {
            Outcome::Failed(f) => assert_eq!(f.kind, FailureKind::Timeout),
            other => panic!("expected timeout failure, got {other:?}"),
        }
        // The batch still terminated with a full report.
        assert_eq!(out.report.succeeded + out.report.failed, out.report.total);
    }

    #[tokio::test]
    async fn progress_ticks_are_monotone_and_exactly_once_per_item() {
        let progress = Arc::new(RecordingProgress::default());
        let out = Dispatcher::new(3)
            .with_progress(Arc::clone(&progress) as Arc<dyn ProgressSink>)
            .run(items(&["A", "B", "C"]), abc_stub(), &xy_labels())
            .await
            .unwrap();

        let ticks = progress.ticks.lock().clone();
        assert_eq!(ticks.len(), out.report.total);
        // Each tick value appears exactly once and the sequence is monotone.
        let mut sorted = ticks.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn chunked_runs_report_as_one_batch() {
        use crate::progress::ChunkedProgress;

        let stub = StubClassifier::new(&[
            ("A", Ok("X")),
            ("B", Ok("X")),
            ("C", Ok("X")),
            ("D", Ok("X")),
            ("E", Ok("X")),
        ]);
        let recording = Arc::new(RecordingProgress::default());
        let overall = Arc::new(ChunkedProgress::new(
            Arc::clone(&recording) as Arc<dyn ProgressSink>,
            5,
        ));
        let dispatcher =
            Dispatcher::new(2).with_progress(Arc::clone(&overall) as Arc<dyn ProgressSink>);

        dispatcher
            .run(items(&["A", "B", "C"]), Arc::clone(&stub) as Arc<dyn Classifier>, &xy_labels())
            .await
            .unwrap();
        dispatcher
            .run(items(&["D", "E"]), Arc::clone(&stub) as Arc<dyn Classifier>, &xy_labels())
            .await
            .unwrap();
        overall.finish();

        // The underlying sink saw a single batch of 5, never a restart.
        assert_eq!(*recording.started.lock(), vec![5]);
        let mut ticks = recording.ticks.lock().clone();
        ticks.sort_unstable();
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn pacer_is_invoked_once_per_completed_item() {
        let pacer = Arc::new(CountingPacer::default());
        Dispatcher::new(2)
            .with_pacer(Arc::clone(&pacer) as Arc<dyn Pacer>)
            .run(items(&["A", "B", "C"]), abc_stub(), &xy_labels())
            .await
            .unwrap();
        assert_eq!(pacer.pauses.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn larger_batch_under_narrow_pool_leaves_nothing_pending() {
        let keys: Vec<String> = (0..50).map(|i| format!("k{i}")).collect();
        let answers: Vec<(&str, Result<&str, ClassifyError>)> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                if i % 7 == 0 {
                    (k.as_str(), Err(ClassifyError::Transient("flaky".into())))
                } else {
                    (k.as_str(), Ok("X"))
                }
            })
            .collect();
        let stub = StubClassifier::new(&answers);
        let work: Vec<WorkItem> =
            keys.iter().map(|k| WorkItem::new(k.clone(), "…")).collect();

        let out = Dispatcher::new(4)
            .run(work, stub, &xy_labels())
            .await
            .unwrap();
        assert_eq!(out.report.total, 50);
        assert_eq!(out.report.succeeded + out.report.failed, 50);
        assert_eq!(out.store.len(), 50);
    }
}
