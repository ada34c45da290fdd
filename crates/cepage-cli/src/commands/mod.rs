//! CLI command implementations.
//!
//! Each command is a thin layer: resolve effective settings (config plus
//! flag overrides), load the dataset, and hand the work to the library
//! crates.

pub mod classify;
pub mod compare;
pub mod distill;
pub mod estimate;
pub mod score;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use cepage_client::ApiClient;
use cepage_core::{Dispatcher, FixedDelay};
use cepage_data::DatasetOptions;

use crate::config::AppConfig;
use crate::progress::BarProgress;

/// Dataset policy from config, with flag overrides applied.
///
/// A sample size of 0 (flag or config) means "use every row".
pub(crate) fn dataset_options(
    cfg: &AppConfig,
    sample: Option<usize>,
    min_count: Option<usize>,
    seed: Option<u64>,
) -> DatasetOptions {
    let sample = match sample.unwrap_or(cfg.dataset.sample_size) {
        0 => None,
        n => Some(n),
    };
    DatasetOptions {
        text_column: cfg.dataset.text_column.clone(),
        label_column: cfg.dataset.label_column.clone(),
        min_label_count: min_count.unwrap_or(cfg.dataset.min_label_count),
        sample,
        seed,
    }
}

/// Dispatcher from config, with flag overrides, a terminal progress bar, and
/// the per-call timeout applied.
pub(crate) fn build_dispatcher(
    cfg: &AppConfig,
    concurrency: Option<usize>,
    pacing_ms: Option<u64>,
    bar_label: &str,
) -> Dispatcher {
    let concurrency = concurrency.unwrap_or(cfg.batch.concurrency);
    let pacing_ms = pacing_ms.unwrap_or(cfg.batch.pacing_ms);

    Dispatcher::new(concurrency)
        .with_pacer(Arc::new(FixedDelay::from_millis(pacing_ms)))
        .with_progress(Arc::new(BarProgress::new(bar_label)))
        .with_call_timeout(Duration::from_secs(cfg.batch.call_timeout_secs))
}

/// Authenticated API client for the configured endpoint.
pub(crate) fn api_client(cfg: &AppConfig) -> Result<ApiClient> {
    Ok(ApiClient::from_env(cfg.api.base_url.clone())?)
}
