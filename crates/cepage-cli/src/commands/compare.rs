//! `cepage compare` — run two model tiers over the same sample.
//!
//! Both tiers see exactly the same work items, so the accuracy gap is the
//! quality cost (or parity) of the cheaper tier.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use cepage_client::LabelClassifier;
use cepage_core::{score, Classifier, Scorecard};
use cepage_data::{Dataset, PromptTemplate};

use crate::config::{expand_path, AppConfig};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    large: &str,
    small: &str,
    dataset_path: &Path,
    sample: Option<usize>,
    min_count: Option<usize>,
    seed: Option<u64>,
    concurrency: Option<usize>,
    pacing_ms: Option<u64>,
    cfg: &AppConfig,
) -> Result<()> {
    let opts = super::dataset_options(cfg, sample, min_count, seed);
    let dataset = Dataset::from_csv(&expand_path(dataset_path), &opts)?;
    let labels = dataset.label_set();
    let items = dataset.work_items(&PromptTemplate::default(), &labels);
    let client = super::api_client(cfg)?;

    info!(large, small, items = items.len(), "comparing model tiers");

    let mut cards: Vec<(String, Scorecard, usize)> = Vec::with_capacity(2);
    for model in [large, small] {
        let classifier: Arc<dyn Classifier> =
            Arc::new(LabelClassifier::new(client.clone(), model, labels.clone()));
        let dispatcher = super::build_dispatcher(cfg, concurrency, pacing_ms, model);
        let output = dispatcher.run(items.clone(), classifier, &labels).await?;
        cards.push((model.to_string(), score(&items, &output.store), output.report.failed));
    }

    println!("Items: {}  Varieties: {}", items.len(), labels.len());
    println!();
    println!("{:<40} {:>10} {:>10}", "Model", "Accuracy", "Failed");
    for (model, card, failed) in &cards {
        let acc = match card.accuracy() {
            Some(a) => format!("{:.1}%", a * 100.0),
            None => "n/a".to_string(),
        };
        println!("{model:<40} {acc:>10} {failed:>10}");
    }

    if let (Some(a), Some(b)) = (cards[0].1.accuracy(), cards[1].1.accuracy()) {
        println!();
        println!("Gap ({} - {}): {:+.1} points", cards[0].0, cards[1].0, (a - b) * 100.0);
    }

    Ok(())
}
