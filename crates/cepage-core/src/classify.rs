//! The inference collaborator seam.

use async_trait::async_trait;

use crate::error::ClassifyError;
use crate::item::WorkItem;

/// An inference collaborator: accepts one work item and returns exactly one
/// label, or a typed failure.
///
/// The dispatcher treats every implementation identically — a hosted chat
/// model, a fine-tuned student model, or a test stub.  Label-enumeration
/// membership is enforced by the dispatcher, so implementations may return
/// whatever the upstream service produced.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, item: &WorkItem) -> Result<String, ClassifyError>;
}
