//! Fine-tuning job polling.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use cepage_client::{ApiClient, JobStatus};

/// Poll a fine-tuning job until it reaches a terminal state.
///
/// Returns the fine-tuned model id on success.  A job still running after
/// `timeout` is treated as a failure of this run; the job itself keeps
/// running upstream and can be polled again later.
pub async fn await_fine_tune(
    client: &ApiClient,
    job_id: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<String> {
    let start = Instant::now();
    info!(job_id, interval_secs = interval.as_secs(), "polling fine-tuning job");

    loop {
        let job = client
            .fine_tune_status(job_id)
            .await
            .with_context(|| format!("Cannot read status of job '{job_id}'"))?;

        match job.status {
            JobStatus::Succeeded => {
                let model_id = job.fine_tuned_model.with_context(|| {
                    format!("Job '{job_id}' succeeded but reported no model id")
                })?;
                info!(job_id, model_id = %model_id, "fine-tuning job succeeded");
                return Ok(model_id);
            }
            JobStatus::Failed => {
                let reason = job.error.unwrap_or_else(|| "no error message".to_string());
                bail!("Fine-tuning job '{job_id}' failed: {reason}");
            }
            JobStatus::Running => {
                debug!(job_id, elapsed_secs = start.elapsed().as_secs(), "job still running");
            }
        }

        if start.elapsed() >= timeout {
            bail!(
                "Fine-tuning job '{job_id}' still running after {}s; re-run later to resume polling",
                timeout.as_secs()
            );
        }
        tokio::time::sleep(interval).await;
    }
}
