//! `cepage classify` — run one model over a dataset sample.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use cepage_client::LabelClassifier;
use cepage_core::{score, BatchOutput, Classifier};
use cepage_data::{Dataset, PromptTemplate};

use crate::config::{expand_path, AppConfig};
use crate::records::write_results;

#[allow(clippy::too_many_arguments)]
pub async fn run(
    model: &str,
    dataset_path: &Path,
    sample: Option<usize>,
    min_count: Option<usize>,
    seed: Option<u64>,
    concurrency: Option<usize>,
    pacing_ms: Option<u64>,
    sequential: bool,
    out: Option<&Path>,
    cfg: &AppConfig,
) -> Result<()> {
    let opts = super::dataset_options(cfg, sample, min_count, seed);
    let dataset = Dataset::from_csv(&expand_path(dataset_path), &opts)?;
    let labels = dataset.label_set();
    let items = dataset.work_items(&PromptTemplate::default(), &labels);

    let client = super::api_client(cfg)?;
    let classifier: Arc<dyn Classifier> =
        Arc::new(LabelClassifier::new(client, model, labels.clone()));
    let dispatcher = super::build_dispatcher(cfg, concurrency, pacing_ms, model);

    info!(model, items = items.len(), varieties = labels.len(), sequential, "starting run");

    let output: BatchOutput = if sequential {
        dispatcher.run_sequential(items.clone(), classifier, &labels).await?
    } else {
        dispatcher.run(items.clone(), classifier, &labels).await?
    };

    let card = score(&items, &output.store);

    println!("Model:      {model}");
    println!("Items:      {}", output.report.total);
    println!("Succeeded:  {}", output.report.succeeded);
    println!("Failed:     {}", output.report.failed);
    match card.accuracy() {
        Some(acc) => println!("Accuracy:   {:.1}% ({}/{})", acc * 100.0, card.correct, card.scored),
        None => println!("Accuracy:   n/a (no ground-truth labels)"),
    }

    for failure in &output.report.failures {
        println!("  failed {}: {}", failure.key, failure.reason);
    }

    if let Some(out) = out {
        let written = write_results(out, &items, &output.store)
            .with_context(|| format!("Cannot write results to {}", out.display()))?;
        println!("Wrote {written} records to {}", out.display());
    }

    Ok(())
}
