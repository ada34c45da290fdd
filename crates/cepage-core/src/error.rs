use thiserror::Error;

use crate::item::{Failure, FailureKind};

/// Typed per-item error returned by an inference collaborator.
///
/// The dispatcher converts these into terminal [`Failure`] records; they
/// never abort the batch.
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    /// Network or upstream error.  Terminal within this batch — callers may
    /// re-batch failed keys manually.
    #[error("transient call failure: {0}")]
    Transient(String),

    /// The response did not parse into the expected structured label.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<ClassifyError> for Failure {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::Transient(msg) => Failure::new(FailureKind::Transient, msg),
            ClassifyError::Malformed(msg) => Failure::new(FailureKind::Malformed, msg),
        }
    }
}

/// Batch-level orchestration error.  Unlike per-item failures, these are
/// fatal and abort the run.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("duplicate work item key '{0}'")]
    DuplicateKey(String),

    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("result already recorded for key '{0}'")]
    DuplicateWrite(String),

    #[error("no result recorded for key '{0}'")]
    MissingResult(String),

    #[error("worker task failed: {0}")]
    Worker(String),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
