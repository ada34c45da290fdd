//! Accuracy scoring over a finished result store.
//!
//! Scoring reads only from the keyed store, never from mutated shared
//! tabular state, so computing it twice over the same store always returns
//! the same numbers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::item::WorkItem;
use crate::store::ResultStore;

/// Correct/total tally for one true label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LabelTally {
    pub total: usize,
    pub correct: usize,
}

/// Accuracy summary for one batch.
///
/// Only items carrying a ground-truth label are scored; a failed call counts
/// as incorrect for its item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Scorecard {
    /// Items with a ground-truth label.
    pub scored: usize,
    /// Items where the predicted label equals the truth.
    pub correct: usize,
    /// Per-true-label breakdown, sorted by label.
    pub per_label: BTreeMap<String, LabelTally>,
}

impl Scorecard {
    /// `mean(predicted == truth)`, or `None` when nothing was scorable.
    pub fn accuracy(&self) -> Option<f64> {
        if self.scored == 0 {
            None
        } else {
            Some(self.correct as f64 / self.scored as f64)
        }
    }
}

/// Score a finished batch against the items' ground truth.
pub fn score(items: &[WorkItem], store: &ResultStore) -> Scorecard {
    let mut card = Scorecard::default();

    for item in items {
        let Some(truth) = item.truth.as_deref() else { continue };
        card.scored += 1;
        let tally = card.per_label.entry(truth.to_string()).or_default();
        tally.total += 1;

        if store.label(&item.key).as_deref() == Some(truth) {
            card.correct += 1;
            tally.correct += 1;
        }
    }

    card
}
