//! Distillation orchestrator.
//!
//! Runs the two-phase workflow:
//!
//! **Phase 1** — Teacher labelling
//! The teacher model classifies every work item through the batch
//! dispatcher.  Labels are appended chunk by chunk to an intermediate JSONL
//! cache in the output directory; an interrupted run resumes from where it
//! left off.  Items the teacher failed on are skipped with a warning — a
//! distillation set tolerates holes better than it tolerates noise.
//!
//! **Phase 2** — Student fine-tuning
//! The cache is converted into a chat-format training file, uploaded, and a
//! fine-tuning job is submitted and polled to completion.  The resulting
//! model id classifies through exactly the same dispatcher path as any
//! other model.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use cepage_client::{ApiClient, LabelClassifier};
use cepage_core::{ChunkedProgress, Dispatcher, LabelSet, WorkItem};

use crate::job::await_fine_tune;
use crate::trainset::{
    append_label_cache, load_label_cache, write_training_file, LabeledExample,
};

/// Items labelled between cache appends.  Small enough that little work is
/// lost on a crash, large enough to keep append overhead negligible.
const CACHE_CHUNK: usize = 32;

/// Settings for one distillation run.
#[derive(Debug, Clone)]
pub struct DistillConfig {
    /// Model tier used to label the dataset.
    pub teacher_model: String,
    /// Base model the fine-tuning job starts from.
    pub student_base: String,
    /// Optional suffix embedded in the fine-tuned model id.
    pub suffix: Option<String>,
    /// System prompt written into every training record.
    pub system_prompt: String,
    /// Delay between job-status polls.
    pub poll_interval: Duration,
    /// Give up polling (not the job itself) after this long.
    pub poll_timeout: Duration,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            teacher_model: "gpt-4o".to_string(),
            student_base: "gpt-4o-mini".to_string(),
            suffix: None,
            system_prompt: "You are a wine expert. Answer with exactly one grape variety."
                .to_string(),
            poll_interval: Duration::from_secs(30),
            poll_timeout: Duration::from_secs(4 * 3600),
        }
    }
}

/// Summary returned after a successful run.
#[derive(Debug, Clone)]
pub struct DistillOutcome {
    /// Training examples written (cached + newly labelled).
    pub examples: usize,
    /// Items the teacher failed on, excluded from the training file.
    pub skipped: usize,
    pub training_file: PathBuf,
    pub job_id: String,
    /// The fine-tuned student model id.
    pub model_id: String,
}

/// Orchestrates Phase 1 (teacher labelling) and Phase 2 (fine-tuning).
pub struct Distiller {
    client: ApiClient,
    dispatcher: Dispatcher,
    config: DistillConfig,
    output_dir: PathBuf,
}

impl Distiller {
    /// `output_dir` holds the intermediate label cache and the training
    /// file.  It is created if it does not exist.
    pub fn new(
        client: ApiClient,
        dispatcher: Dispatcher,
        config: DistillConfig,
        output_dir: PathBuf,
    ) -> Self {
        Self { client, dispatcher, config, output_dir }
    }

    /// Run the full workflow and return the student model id.
    pub async fn run(&self, items: Vec<WorkItem>, labels: &LabelSet) -> Result<DistillOutcome> {
        std::fs::create_dir_all(&self.output_dir)
            .with_context(|| format!("Cannot create output dir: {}", self.output_dir.display()))?;

        let cache_path = self.output_dir.join("teacher_labels.jsonl");
        let (examples, skipped) = self.label_with_teacher(items, labels, &cache_path).await?;

        anyhow::ensure!(
            !examples.is_empty(),
            "Teacher produced no usable labels; nothing to fine-tune on"
        );

        let training_path = self.output_dir.join("train.jsonl");
        let written = write_training_file(&training_path, &examples, &self.config.system_prompt)?;
        info!(
            path = %training_path.display(),
            examples = written,
            skipped,
            "Phase 2: training file ready"
        );

        let file_id = self.client.upload_training_file(&training_path).await?;
        let job = self
            .client
            .create_fine_tune(&file_id, &self.config.student_base, self.config.suffix.as_deref())
            .await?;
        let model_id = await_fine_tune(
            &self.client,
            &job.id,
            self.config.poll_interval,
            self.config.poll_timeout,
        )
        .await?;

        Ok(DistillOutcome {
            examples: written,
            skipped,
            training_file: training_path,
            job_id: job.id,
            model_id,
        })
    }

    // ── Phase 1 ───────────────────────────────────────────────────────────────

    /// Label every item with the teacher model, resuming from the cache.
    ///
    /// Returns all examples (cached + new) and the count of items skipped
    /// because the teacher's call failed.
    async fn label_with_teacher(
        &self,
        items: Vec<WorkItem>,
        labels: &LabelSet,
        cache_path: &std::path::Path,
    ) -> Result<(Vec<LabeledExample>, usize)> {
        let total = items.len();
        let mut examples = load_label_cache(cache_path)?;
        let done: HashSet<String> = examples.iter().map(|e| e.key.clone()).collect();

        let remaining: Vec<WorkItem> =
            items.into_iter().filter(|i| !done.contains(&i.key)).collect();

        if remaining.is_empty() {
            info!(
                path = %cache_path.display(),
                cached = examples.len(),
                "Phase 1 already complete, reusing teacher_labels.jsonl"
            );
            return Ok((examples, 0));
        }

        info!(
            total,
            cached = examples.len(),
            remaining = remaining.len(),
            teacher = %self.config.teacher_model,
            "Phase 1: labelling with the teacher model"
        );

        let classifier = std::sync::Arc::new(LabelClassifier::new(
            self.client.clone(),
            self.config.teacher_model.clone(),
            labels.clone(),
        ));

        // One overall progress view across all chunks, so an attached bar
        // tracks the whole phase instead of restarting every chunk.
        let overall =
            std::sync::Arc::new(ChunkedProgress::new(self.dispatcher.progress(), remaining.len()));
        let dispatcher = self.dispatcher.clone().with_progress(overall.clone());

        let mut skipped = 0usize;
        for chunk in remaining.chunks(CACHE_CHUNK) {
            let out = dispatcher
                .run(chunk.to_vec(), classifier.clone(), labels)
                .await
                .context("Teacher labelling batch failed")?;

            for failure in &out.report.failures {
                warn!(key = %failure.key, reason = %failure.reason, "skipping item the teacher failed on");
            }
            skipped += out.report.failed;

            let mut fresh = Vec::with_capacity(out.report.succeeded);
            for item in chunk {
                if let Some(label) = out.store.label(&item.key) {
                    fresh.push(LabeledExample {
                        key: item.key.clone(),
                        input: item.input.clone(),
                        label,
                    });
                }
            }
            // Append immediately so an interrupted run resumes here.
            append_label_cache(cache_path, &fresh)?;
            examples.extend(fresh);
        }
        overall.finish();

        info!(
            path = %cache_path.display(),
            examples = examples.len(),
            skipped,
            "Phase 1 complete"
        );
        Ok((examples, skipped))
    }
}
