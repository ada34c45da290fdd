//! Saved results files.
//!
//! `classify --out` writes one record per work item; `score` recomputes
//! accuracy from the file without touching the API, so scoring a saved run
//! is repeatable.

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cepage_core::{Outcome, ResultStore, WorkItem};

/// One classified item in a saved results file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub key: String,
    pub truth: Option<String>,
    pub predicted: Option<String>,
    pub error: Option<String>,
    pub latency_ms: u64,
}

/// Write one JSONL record per item, in item order.
pub fn write_results(path: &Path, items: &[WorkItem], store: &ResultStore) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    let mut written = 0usize;
    for item in items {
        let Some(result) = store.get(&item.key) else { continue };
        let (predicted, error) = match result.outcome {
            Outcome::Label(label) => (Some(label), None),
            Outcome::Failed(failure) => (None, Some(failure.to_string())),
        };
        let record = RunRecord {
            key: item.key.clone(),
            truth: item.truth.clone(),
            predicted,
            error,
            latency_ms: result.latency_ms,
        };
        writeln!(writer, "{}", serde_json::to_string(&record)?)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Read a saved results file.
pub fn read_results(path: &Path) -> Result<Vec<RunRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;

    let mut records = Vec::new();
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record: RunRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("Parse error at {}:{}", path.display(), i + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// `mean(predicted == truth)` over records that carry a truth label.
pub fn accuracy(records: &[RunRecord]) -> Option<f64> {
    let mut scored = 0usize;
    let mut correct = 0usize;
    for record in records {
        let Some(truth) = record.truth.as_deref() else { continue };
        scored += 1;
        if record.predicted.as_deref() == Some(truth) {
            correct += 1;
        }
    }
    if scored == 0 {
        None
    } else {
        Some(correct as f64 / scored as f64)
    }
}
