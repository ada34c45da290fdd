use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod progress;
mod records;

use config::load_config;

/// cepage — LLM wine-variety classification and distillation
#[derive(Debug, Parser)]
#[command(name = "cepage", version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Path to a custom configuration file (TOML).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log format: "pretty" (default) or "json".
    #[arg(long, global = true, default_value = "pretty", value_name = "FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify a dataset sample with one model and report accuracy.
    Classify {
        /// Model to classify with (e.g. gpt-4o-mini, or a fine-tuned id).
        #[arg(long, short = 'm')]
        model: String,

        /// Path to the reviews CSV.
        #[arg(long)]
        dataset: PathBuf,

        /// Sample size; 0 uses every row. Defaults from config.
        #[arg(long)]
        sample: Option<usize>,

        /// Keep only labels with at least this many occurrences.
        #[arg(long)]
        min_count: Option<usize>,

        /// RNG seed for a reproducible sample.
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum calls in flight.
        #[arg(long, short = 'c')]
        concurrency: Option<usize>,

        /// Fixed delay between calls per worker slot, in milliseconds.
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Run one item at a time, in item order (debugging cross-check).
        #[arg(long)]
        sequential: bool,

        /// Write per-item results to this JSONL file.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Classify the same sample with two model tiers and compare accuracy.
    Compare {
        /// The larger (reference) model tier.
        #[arg(long)]
        large: String,

        /// The smaller (candidate) model tier.
        #[arg(long)]
        small: String,

        /// Path to the reviews CSV.
        #[arg(long)]
        dataset: PathBuf,

        /// Sample size; 0 uses every row. Defaults from config.
        #[arg(long)]
        sample: Option<usize>,

        /// Keep only labels with at least this many occurrences.
        #[arg(long)]
        min_count: Option<usize>,

        /// RNG seed for a reproducible sample.
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum calls in flight.
        #[arg(long, short = 'c')]
        concurrency: Option<usize>,

        /// Fixed delay between calls per worker slot, in milliseconds.
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Estimate token usage and cost for a batch, without calling the API.
    Estimate {
        /// Path to the reviews CSV.
        #[arg(long)]
        dataset: PathBuf,

        /// Sample size; 0 uses every row. Defaults from config.
        #[arg(long)]
        sample: Option<usize>,

        /// Keep only labels with at least this many occurrences.
        #[arg(long)]
        min_count: Option<usize>,

        /// RNG seed for a reproducible sample.
        #[arg(long)]
        seed: Option<u64>,

        /// Input price per million tokens, in USD.
        #[arg(long, default_value_t = 2.5)]
        input_price: f64,

        /// Output price per million tokens, in USD.
        #[arg(long, default_value_t = 10.0)]
        output_price: f64,

        /// Expected output tokens per item (a single structured label).
        #[arg(long, default_value_t = 8)]
        output_tokens: usize,
    },

    /// Distil a large teacher model into a fine-tuned student model.
    Distill {
        /// Teacher model used to label the dataset.
        #[arg(long)]
        teacher: String,

        /// Base model the fine-tuning job starts from.
        #[arg(long)]
        student_base: String,

        /// Path to the reviews CSV.
        #[arg(long)]
        dataset: PathBuf,

        /// Output directory for the label cache and training file.
        #[arg(long)]
        out_dir: PathBuf,

        /// Suffix embedded in the fine-tuned model id.
        #[arg(long)]
        suffix: Option<String>,

        /// Sample size; 0 uses every row. Defaults from config.
        #[arg(long)]
        sample: Option<usize>,

        /// Keep only labels with at least this many occurrences.
        #[arg(long)]
        min_count: Option<usize>,

        /// RNG seed for a reproducible sample.
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum calls in flight during teacher labelling.
        #[arg(long, short = 'c')]
        concurrency: Option<usize>,

        /// Fixed delay between calls per worker slot, in milliseconds.
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Evaluate the student on the same sample once the job succeeds.
        #[arg(long)]
        eval: bool,
    },

    /// Recompute accuracy from a saved results file.
    Score {
        /// Path to a results JSONL written by `classify --out`.
        results: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_format);

    let cfg = load_config(cli.config.as_ref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Classify {
            model,
            dataset,
            sample,
            min_count,
            seed,
            concurrency,
            pacing_ms,
            sequential,
            out,
        } => {
            commands::classify::run(
                &model,
                &dataset,
                sample,
                min_count,
                seed,
                concurrency,
                pacing_ms,
                sequential,
                out.as_deref(),
                &cfg,
            )
            .await?;
        }
        Commands::Compare { large, small, dataset, sample, min_count, seed, concurrency, pacing_ms } => {
            commands::compare::run(
                &large,
                &small,
                &dataset,
                sample,
                min_count,
                seed,
                concurrency,
                pacing_ms,
                &cfg,
            )
            .await?;
        }
        Commands::Estimate {
            dataset,
            sample,
            min_count,
            seed,
            input_price,
            output_price,
            output_tokens,
        } => {
            commands::estimate::run(
                &dataset,
                sample,
                min_count,
                seed,
                input_price,
                output_price,
                output_tokens,
                &cfg,
            )?;
        }
        Commands::Distill {
            teacher,
            student_base,
            dataset,
            out_dir,
            suffix,
            sample,
            min_count,
            seed,
            concurrency,
            pacing_ms,
            eval,
        } => {
            commands::distill::run(
                &teacher,
                &student_base,
                &dataset,
                &out_dir,
                suffix.as_deref(),
                sample,
                min_count,
                seed,
                concurrency,
                pacing_ms,
                eval,
                &cfg,
            )
            .await?;
        }
        Commands::Score { results } => {
            commands::score::run(&results)?;
        }
    }

    Ok(())
}

fn init_tracing(log_format: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if log_format == "json" {
        registry
            .with(fmt::layer().json())
            .init();
    } else {
        registry
            .with(fmt::layer().pretty())
            .init();
    }
}
