//! Work items and their terminal results.
//!
//! A [`WorkItem`] is one unit of inference work: a unique identity key, the
//! rendered input payload sent to the model, and an optional ground-truth
//! label used for scoring.  After a batch completes, every item has exactly
//! one [`InferenceResult`] — never zero, never more than one.

use serde::{Deserialize, Serialize};

/// One unit of inference work.
///
/// `key` must be unique within a batch; insertion order defines the canonical
/// iteration order used by the sequential mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Identity key, unique within a batch.
    pub key: String,
    /// Input payload for the model (the fully rendered prompt).
    pub input: String,
    /// Ground-truth label, when known.
    pub truth: Option<String>,
}

impl WorkItem {
    pub fn new(key: impl Into<String>, input: impl Into<String>) -> Self {
        Self { key: key.into(), input: input.into(), truth: None }
    }

    pub fn with_truth(mut self, truth: impl Into<String>) -> Self {
        self.truth = Some(truth.into());
        self
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Why an item's inference call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or upstream-service error; might succeed in a later batch.
    Transient,
    /// The response did not parse into the expected structured label, or the
    /// label fell outside the allowed enumeration.
    Malformed,
    /// The call exceeded the configured per-call time limit.
    Timeout,
}

/// Terminal failure recorded for an item.  Terminal within the batch: the
/// dispatcher never retries (callers may re-batch failed keys manually).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            FailureKind::Transient => "transient",
            FailureKind::Malformed => "malformed",
            FailureKind::Timeout => "timeout",
        };
        write!(f, "{kind}: {}", self.message)
    }
}

/// Terminal outcome of one inference call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The model returned a label from the allowed enumeration.
    Label(String),
    /// The call failed; the failure is terminal for this item.
    Failed(Failure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Label(_))
    }

    /// The predicted label, when the call succeeded.
    pub fn label(&self) -> Option<&str> {
        match self {
            Outcome::Label(l) => Some(l),
            Outcome::Failed(_) => None,
        }
    }
}

/// The single terminal record produced for a [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Identity key of the item this result belongs to.
    pub key: String,
    pub outcome: Outcome,
    /// Wall-clock latency of the inference call, in milliseconds.
    pub latency_ms: u64,
    /// Number of calls issued for this item.  Always 1 today; kept explicit
    /// so a retry extension does not change the record shape.
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_accessors() {
        let ok = Outcome::Label("Riesling".into());
        assert!(ok.is_success());
        assert_eq!(ok.label(), Some("Riesling"));

        let failed = Outcome::Failed(Failure::new(FailureKind::Transient, "502"));
        assert!(!failed.is_success());
        assert_eq!(failed.label(), None);
    }

    #[test]
    fn failure_display_names_kind() {
        let f = Failure::new(FailureKind::Timeout, "no response within 30s");
        assert_eq!(f.to_string(), "timeout: no response within 30s");
    }

    #[test]
    fn result_roundtrips_through_json() {
        let res = InferenceResult {
            key: "row-3".into(),
            outcome: Outcome::Label("Malbec".into()),
            latency_ms: 412,
            attempts: 1,
        };
        let json = serde_json::to_string(&res).unwrap();
        let back: InferenceResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, res);
    }
}
