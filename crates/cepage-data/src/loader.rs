//! Reviews CSV loading, filtering, and sampling.
//!
//! Reads a CSV with (at least) a free-text column and a label column,
//! restricts rows to labels that occur at least `min_label_count` times in
//! the full file, and optionally draws a fixed-size random sample.  Rows
//! keep their original file order throughout, which defines the canonical
//! iteration order of the resulting work items.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use cepage_core::{LabelSet, WorkItem};

use crate::prompt::PromptTemplate;

/// One usable dataset row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub text: String,
    pub variety: String,
}

/// Filtering and sampling policy.
#[derive(Debug, Clone)]
pub struct DatasetOptions {
    /// CSV column holding the review text.
    pub text_column: String,
    /// CSV column holding the true label.
    pub label_column: String,
    /// Keep only labels with at least this many occurrences in the file.
    pub min_label_count: usize,
    /// Draw a random sample of this size after filtering.
    pub sample: Option<usize>,
    /// RNG seed for reproducible samples.
    pub seed: Option<u64>,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            text_column: "description".to_string(),
            label_column: "variety".to_string(),
            min_label_count: 1,
            sample: None,
            seed: None,
        }
    }
}

/// An ordered, filtered, optionally sampled set of reviews.
#[derive(Debug, Clone)]
pub struct Dataset {
    reviews: Vec<Review>,
}

impl Dataset {
    /// Load a dataset from a CSV file under the given policy.
    pub fn from_csv(path: &Path, opts: &DatasetOptions) -> Result<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Cannot open {}", path.display()))?
            .finish()
            .with_context(|| format!("CSV parse error in {}", path.display()))?;

        let text_col = df
            .column(&opts.text_column)
            .with_context(|| format!("Missing column '{}'", opts.text_column))?;
        let label_col = df
            .column(&opts.label_column)
            .with_context(|| format!("Missing column '{}'", opts.label_column))?;

        // Rows with a null/empty text or label are unusable.
        let mut reviews = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(text), Some(variety)) = (str_at(text_col, i), str_at(label_col, i)) else {
                continue;
            };
            if text.is_empty() || variety.is_empty() {
                continue;
            }
            reviews.push(Review { text, variety });
        }

        let loaded = reviews.len();
        let reviews = filter_rare_labels(reviews, opts.min_label_count);
        let after_filter = reviews.len();
        let reviews = match opts.sample {
            Some(n) => sample_preserving_order(reviews, n, opts.seed),
            None => reviews,
        };

        info!(
            path = %path.display(),
            loaded,
            after_filter,
            final_count = reviews.len(),
            min_label_count = opts.min_label_count,
            "Dataset loaded"
        );

        anyhow::ensure!(
            !reviews.is_empty(),
            "No usable rows in {} after filtering (min_label_count = {})",
            path.display(),
            opts.min_label_count
        );

        Ok(Self { reviews })
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn as_slice(&self) -> &[Review] {
        &self.reviews
    }

    /// The distinct labels observed in this dataset, first-seen order.
    pub fn label_set(&self) -> LabelSet {
        LabelSet::new(self.reviews.iter().map(|r| r.variety.clone()))
    }

    /// Render every review into an ordered work-item sequence with unique
    /// `row-<n>` keys and ground-truth labels attached.
    pub fn work_items(&self, template: &PromptTemplate, labels: &LabelSet) -> Vec<WorkItem> {
        self.reviews
            .iter()
            .enumerate()
            .map(|(i, review)| {
                WorkItem::new(format!("row-{i}"), template.render(&review.text, labels))
                    .with_truth(review.variety.clone())
            })
            .collect()
    }
}

// ── Policy helpers ────────────────────────────────────────────────────────────

/// Keep rows whose label occurs at least `min_count` times.
fn filter_rare_labels(reviews: Vec<Review>, min_count: usize) -> Vec<Review> {
    if min_count <= 1 {
        return reviews;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for review in &reviews {
        *counts.entry(review.variety.as_str()).or_default() += 1;
    }
    let keep: std::collections::HashSet<String> = counts
        .into_iter()
        .filter(|(_, c)| *c >= min_count)
        .map(|(label, _)| label.to_string())
        .collect();
    reviews.into_iter().filter(|r| keep.contains(&r.variety)).collect()
}

/// Draw `n` rows at random, keeping the surviving rows in file order.
fn sample_preserving_order(reviews: Vec<Review>, n: usize, seed: Option<u64>) -> Vec<Review> {
    if n >= reviews.len() {
        return reviews;
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut indices: Vec<usize> = (0..reviews.len()).collect();
    indices.shuffle(&mut rng);
    indices.truncate(n);
    indices.sort_unstable();
    indices.into_iter().map(|i| reviews[i].clone()).collect()
}

/// String cell at row `i`, or `None` for nulls and non-string values.
fn str_at(col: &Column, i: usize) -> Option<String> {
    match col.get(i) {
        Ok(AnyValue::String(s)) => Some(s.to_string()),
        Ok(AnyValue::StringOwned(s)) => Some(s.to_string()),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
