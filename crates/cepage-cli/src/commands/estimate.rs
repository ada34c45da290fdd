//! `cepage estimate` — pre-flight cost printout, no API calls.

use std::path::Path;

use anyhow::Result;

use cepage_client::{estimate_batch_cost, Pricing};
use cepage_data::{Dataset, PromptTemplate};

use crate::config::{expand_path, AppConfig};

#[allow(clippy::too_many_arguments)]
pub fn run(
    dataset_path: &Path,
    sample: Option<usize>,
    min_count: Option<usize>,
    seed: Option<u64>,
    input_price: f64,
    output_price: f64,
    output_tokens: usize,
    cfg: &AppConfig,
) -> Result<()> {
    let opts = super::dataset_options(cfg, sample, min_count, seed);
    let dataset = Dataset::from_csv(&expand_path(dataset_path), &opts)?;
    let labels = dataset.label_set();
    let items = dataset.work_items(&PromptTemplate::default(), &labels);

    let pricing = Pricing { input_per_million: input_price, output_per_million: output_price };
    let est = estimate_batch_cost(
        items.iter().map(|i| i.input.as_str()),
        output_tokens,
        pricing,
    );

    println!("Items:            {}", items.len());
    println!("Varieties:        {}", labels.len());
    println!("Input tokens:     ~{}", est.input_tokens);
    println!("Output tokens:    ~{}", est.output_tokens);
    println!("Estimated cost:   ${:.4}", est.usd);
    println!();
    println!(
        "(at ${input_price}/M input, ${output_price}/M output; \
         ~4 chars per token, {output_tokens} output tokens per item)"
    );

    Ok(())
}
