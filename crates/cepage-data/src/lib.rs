//! # cepage-data
//!
//! The dataset collaborator: supplies the ordered work-item sequence for a
//! batch and owns all filtering and sampling policy.  The dispatcher never
//! sees any of this — it receives finished [`cepage_core::WorkItem`]s.
//!
//! - [`loader`] reads a reviews CSV, restricts it to labels with at least N
//!   occurrences, and draws a fixed-size random sample.
//! - [`prompt`] renders each review into the input payload sent to the
//!   model.

pub mod loader;
pub mod prompt;

pub use loader::{Dataset, DatasetOptions, Review};
pub use prompt::PromptTemplate;
