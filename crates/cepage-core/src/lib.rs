//! # cepage-core
//!
//! Bounded-concurrency batch inference dispatcher.
//!
//! Sends many independent classification requests against a rate-limited
//! external service, collects results keyed by item identity, and reports
//! per-item success/failure without dropping or duplicating work:
//!
//! - at most `concurrency` calls in flight at once, pulled from the item
//!   sequence by a fixed-size worker pool;
//! - an injected [`Pacer`] strategy paces each worker slot between calls;
//! - exactly one terminal [`InferenceResult`] per [`WorkItem`] is written
//!   into the shared [`ResultStore`];
//! - per-item failures are typed ([`ClassifyError`]), logged, and never
//!   abort the batch; the final [`BatchReport`] enumerates them;
//! - a sequential mode runs the same contract in strict item order and
//!   produces an identical report, as a correctness cross-check.

pub mod classify;
pub mod dispatch;
pub mod error;
pub mod item;
pub mod labels;
pub mod pacing;
pub mod progress;
pub mod report;
pub mod score;
pub mod store;

pub use classify::Classifier;
pub use dispatch::{BatchOutput, Dispatcher};
pub use error::{ClassifyError, DispatchError, DispatchResult};
pub use item::{Failure, FailureKind, InferenceResult, Outcome, WorkItem};
pub use labels::LabelSet;
pub use pacing::{FixedDelay, NoPacing, Pacer};
pub use progress::{ChunkedProgress, NullProgress, ProgressSink};
pub use report::{BatchReport, FailedItem};
pub use score::{score, LabelTally, Scorecard};
pub use store::ResultStore;
