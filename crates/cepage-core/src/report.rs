//! Aggregate batch reports.

use serde::Serialize;

use crate::error::{DispatchError, DispatchResult};
use crate::item::{Outcome, WorkItem};
use crate::store::ResultStore;

/// One failed item, with the reason the caller would need to decide whether
/// to re-batch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub key: String,
    pub reason: String,
}

/// Aggregate over all results of a finished batch.
///
/// Only constructed once every item has a terminal result, so
/// `succeeded + failed == total` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failed keys with reasons, in item order.
    pub failures: Vec<FailedItem>,
}

impl BatchReport {
    pub fn empty() -> Self {
        Self { total: 0, succeeded: 0, failed: 0, failures: Vec::new() }
    }

    /// Build the report by walking `items` in order and looking each key up
    /// in the store.  Item order (not completion order) drives the failure
    /// list, so the concurrent and sequential modes report identically.
    pub fn from_store(items: &[WorkItem], store: &ResultStore) -> DispatchResult<Self> {
        let mut report = Self { total: items.len(), ..Self::empty() };

        for item in items {
            let result = store
                .get(&item.key)
                .ok_or_else(|| DispatchError::MissingResult(item.key.clone()))?;
            match result.outcome {
                Outcome::Label(_) => report.succeeded += 1,
                Outcome::Failed(failure) => {
                    report.failed += 1;
                    report.failures.push(FailedItem {
                        key: item.key.clone(),
                        reason: failure.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Failure, FailureKind, InferenceResult};

    fn store_with(entries: &[(&str, Outcome)]) -> ResultStore {
        let store = ResultStore::new();
        for (key, outcome) in entries {
            store
                .record(InferenceResult {
                    key: (*key).into(),
                    outcome: outcome.clone(),
                    latency_ms: 1,
                    attempts: 1,
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn counts_add_up_and_failures_follow_item_order() {
        let items = vec![
            WorkItem::new("a", "…"),
            WorkItem::new("b", "…"),
            WorkItem::new("c", "…"),
        ];
        let store = store_with(&[
            ("c", Outcome::Failed(Failure::new(FailureKind::Transient, "503"))),
            ("a", Outcome::Label("X".into())),
            ("b", Outcome::Failed(Failure::new(FailureKind::Malformed, "not a label"))),
        ]);

        let report = BatchReport::from_store(&items, &store).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded + report.failed, report.total);
        // Item order, not completion order.
        assert_eq!(report.failures[0].key, "b");
        assert_eq!(report.failures[1].key, "c");
    }

    #[test]
    fn missing_result_is_batch_fatal() {
        let items = vec![WorkItem::new("a", "…"), WorkItem::new("b", "…")];
        let store = store_with(&[("a", Outcome::Label("X".into()))]);
        let err = BatchReport::from_store(&items, &store).unwrap_err();
        assert!(matches!(err, DispatchError::MissingResult(k) if k == "b"));
    }
}
