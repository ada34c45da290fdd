//! Keyed result store shared across workers.
//!
//! The store is the only shared mutable state in a batch run.  Workers write
//! distinct keys; a second write to the same key is an orchestration bug and
//! is reported as a batch-fatal [`DispatchError::DuplicateWrite`].

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{DispatchError, DispatchResult};
use crate::item::InferenceResult;

/// Thread-safe mapping from identity key to [`InferenceResult`], with
/// at-most-once write semantics per key.
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<HashMap<String, InferenceResult>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the terminal result for a key.
    ///
    /// Errors if a result for this key already exists; in that case the
    /// existing entry is left untouched.
    pub fn record(&self, result: InferenceResult) -> DispatchResult<()> {
        let mut map = self.inner.lock();
        if map.contains_key(&result.key) {
            return Err(DispatchError::DuplicateWrite(result.key));
        }
        map.insert(result.key.clone(), result);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<InferenceResult> {
        self.inner.lock().get(key).cloned()
    }

    /// The predicted label for a key, when its call succeeded.
    pub fn label(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .get(key)
            .and_then(|r| r.outcome.label().map(String::from))
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// All results, sorted by key for deterministic iteration.
    pub fn snapshot(&self) -> Vec<InferenceResult> {
        let mut all: Vec<InferenceResult> = self.inner.lock().values().cloned().collect();
        all.sort_by(|a, b| a.key.cmp(&b.key));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Outcome;

    fn result(key: &str, label: &str) -> InferenceResult {
        InferenceResult {
            key: key.into(),
            outcome: Outcome::Label(label.into()),
            latency_ms: 10,
            attempts: 1,
        }
    }

    #[test]
    fn record_and_get() {
        let store = ResultStore::new();
        store.record(result("a", "X")).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.label("a").as_deref(), Some("X"));
        assert!(store.get("b").is_none());
    }

    #[test]
    fn second_write_to_same_key_is_rejected() {
        let store = ResultStore::new();
        store.record(result("a", "X")).unwrap();
        let err = store.record(result("a", "Y")).unwrap_err();
        assert!(matches!(err, DispatchError::DuplicateWrite(k) if k == "a"));
        // First write survives.
        assert_eq!(store.label("a").as_deref(), Some("X"));
    }

    #[test]
    fn snapshot_is_key_sorted() {
        let store = ResultStore::new();
        store.record(result("c", "1")).unwrap();
        store.record(result("a", "2")).unwrap();
        store.record(result("b", "3")).unwrap();
        let all = store.snapshot();
        let keys: Vec<&str> = all.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
