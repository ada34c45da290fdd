//! `cepage distill` — label with a teacher model, fine-tune a student.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use cepage_client::LabelClassifier;
use cepage_core::{score, Classifier};
use cepage_data::{Dataset, PromptTemplate};
use cepage_distill::{DistillConfig, Distiller};

use crate::config::{expand_path, AppConfig};

#[allow(clippy::too_many_arguments)]
pub async fn run(
    teacher: &str,
    student_base: &str,
    dataset_path: &Path,
    out_dir: &Path,
    suffix: Option<&str>,
    sample: Option<usize>,
    min_count: Option<usize>,
    seed: Option<u64>,
    concurrency: Option<usize>,
    pacing_ms: Option<u64>,
    eval: bool,
    cfg: &AppConfig,
) -> Result<()> {
    let opts = super::dataset_options(cfg, sample, min_count, seed);
    let dataset = Dataset::from_csv(&expand_path(dataset_path), &opts)?;
    let labels = dataset.label_set();
    let items = dataset.work_items(&PromptTemplate::default(), &labels);

    let client = super::api_client(cfg)?;
    let dispatcher = super::build_dispatcher(cfg, concurrency, pacing_ms, teacher);

    let distill_cfg = DistillConfig {
        teacher_model: teacher.to_string(),
        student_base: student_base.to_string(),
        suffix: suffix.map(str::to_string),
        poll_interval: Duration::from_secs(cfg.distill.poll_interval_secs),
        poll_timeout: Duration::from_secs(cfg.distill.poll_timeout_secs),
        ..DistillConfig::default()
    };

    let distiller = Distiller::new(
        client.clone(),
        dispatcher,
        distill_cfg,
        expand_path(out_dir),
    );
    let outcome = distiller.run(items.clone(), &labels).await?;

    println!("Training examples: {}", outcome.examples);
    println!("Skipped items:     {}", outcome.skipped);
    println!("Training file:     {}", outcome.training_file.display());
    println!("Job id:            {}", outcome.job_id);
    println!("Student model:     {}", outcome.model_id);

    if eval {
        info!(model = %outcome.model_id, "evaluating the student on the same sample");
        let classifier: Arc<dyn Classifier> =
            Arc::new(LabelClassifier::new(client, outcome.model_id.clone(), labels.clone()));
        let eval_dispatcher =
            super::build_dispatcher(cfg, concurrency, pacing_ms, &outcome.model_id);
        let output = eval_dispatcher.run(items.clone(), classifier, &labels).await?;
        let card = score(&items, &output.store);
        match card.accuracy() {
            Some(acc) => println!(
                "Student accuracy:  {:.1}% ({}/{})",
                acc * 100.0,
                card.correct,
                card.scored
            ),
            None => println!("Student accuracy:  n/a"),
        }
    }

    Ok(())
}
