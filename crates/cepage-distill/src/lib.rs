//! # cepage-distill
//!
//! Knowledge-distillation workflow for cepage.
//!
//! Trains a smaller *student* model to imitate a larger *teacher* model's
//! classifications using the hosted fine-tuning API:
//!
//! 1. **Phase 1** — The teacher model labels every work item through the
//!    batch dispatcher; labels are cached to an append-only JSONL file so an
//!    interrupted run resumes where it left off.
//! 2. **Phase 2** — The labels become a chat-format training file, which is
//!    uploaded to the fine-tuning API; the job is submitted and polled until
//!    it succeeds or fails.
//!
//! The resulting model id is an ordinary inference collaborator — evaluating
//! the student is the same `classify` run with a different model name:
//!
//! ```text
//! cepage distill \
//!   --teacher  gpt-4o \
//!   --student-base gpt-4o-mini \
//!   --dataset  reviews.csv \
//!   --out-dir  ./output/wine-student
//! ```

pub mod distiller;
pub mod job;
pub mod trainset;

pub use distiller::{DistillConfig, Distiller, DistillOutcome};
pub use job::await_fine_tune;
pub use trainset::{LabeledExample, TrainingRecord};
