//! Closed enumerations of allowed output labels.
//!
//! The enumeration is supplied per batch, typically derived from the distinct
//! label values observed in a reference dataset.  An empty set means the
//! batch is unconstrained and any returned label is accepted.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::item::WorkItem;

/// A closed set of allowed labels, deduplicated, first-seen order preserved.
///
/// Serializes as the plain label list; deserializing goes through
/// [`LabelSet::new`] so the membership index is rebuilt.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: Vec<String>,
    #[serde(skip)]
    index: HashSet<String>,
}

impl<'de> Deserialize<'de> for LabelSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::new(Vec::<String>::deserialize(deserializer)?))
    }
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for label in labels {
            set.insert(label.into());
        }
        set
    }

    /// Derive the enumeration from the distinct ground-truth labels of a
    /// batch, in first-seen order.
    pub fn from_truths(items: &[WorkItem]) -> Self {
        Self::new(items.iter().filter_map(|i| i.truth.clone()))
    }

    fn insert(&mut self, label: String) {
        if self.index.insert(label.clone()) {
            self.labels.push(label);
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains(label)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// An empty set means "unconstrained".
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_preserving_first_seen_order() {
        let set = LabelSet::new(["Merlot", "Pinot Noir", "Merlot", "Riesling"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.as_slice(), &["Merlot", "Pinot Noir", "Riesling"]);
    }

    #[test]
    fn membership() {
        let set = LabelSet::new(["Syrah"]);
        assert!(set.contains("Syrah"));
        assert!(!set.contains("syrah"));
        assert!(!set.contains("Gamay"));
    }

    #[test]
    fn from_truths_skips_unlabelled_items() {
        let items = vec![
            WorkItem::new("a", "…").with_truth("Malbec"),
            WorkItem::new("b", "…"),
            WorkItem::new("c", "…").with_truth("Malbec"),
            WorkItem::new("d", "…").with_truth("Barbera"),
        ];
        let set = LabelSet::from_truths(&items);
        assert_eq!(set.as_slice(), &["Malbec", "Barbera"]);
    }

    #[test]
    fn deserialized_set_keeps_membership() {
        let set = LabelSet::new(["Merlot", "Syrah"]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Merlot","Syrah"]"#);

        let back: LabelSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_slice(), set.as_slice());
        assert!(back.contains("Syrah"));
        assert!(!back.contains("Gamay"));
        assert!(!back.is_empty());
    }

    #[test]
    fn empty_set_is_unconstrained() {
        let set = LabelSet::default();
        assert!(set.is_empty());
        assert!(!set.contains("anything"));
    }
}
