//! Fine-tuning job collaborator.
//!
//! The job is opaque: upload a training file, create the job, read its
//! status until it reaches a terminal state.  On success the resulting model
//! id is a drop-in inference collaborator — nothing downstream special-cases
//! fine-tuned models.

use std::path::Path;

use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ClientError, ClientResult};
use crate::ApiClient;

/// The three-state view of an upstream job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Collapse the service's richer status vocabulary into three states.
    fn from_raw(raw: &str) -> Self {
        match raw {
            "succeeded" => JobStatus::Succeeded,
            "failed" | "cancelled" => JobStatus::Failed,
            // queued, validating_files, running, …
            _ => JobStatus::Running,
        }
    }
}

/// Snapshot of a fine-tuning job.
#[derive(Debug, Clone)]
pub struct FineTuneJob {
    pub id: String,
    pub status: JobStatus,
    /// Model id usable for inference; present once the job succeeded.
    pub fine_tuned_model: Option<String>,
    /// Upstream error message, when the job failed.
    pub error: Option<String>,
}

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct FileObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct JobObject {
    id: String,
    status: String,
    fine_tuned_model: Option<String>,
    error: Option<JobError>,
}

#[derive(Debug, Deserialize)]
struct JobError {
    message: Option<String>,
}

impl From<JobObject> for FineTuneJob {
    fn from(raw: JobObject) -> Self {
        Self {
            id: raw.id,
            status: JobStatus::from_raw(&raw.status),
            fine_tuned_model: raw.fine_tuned_model,
            error: raw.error.and_then(|e| e.message),
        }
    }
}

// ─── Client calls ─────────────────────────────────────────────────────────────

impl ApiClient {
    /// Upload a JSONL training file and return its file id.
    pub async fn upload_training_file(&self, path: &Path) -> ClientResult<String> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "training.jsonl".to_string());

        info!(path = %path.display(), bytes = bytes.len(), "uploading training file");

        let form = reqwest::multipart::Form::new()
            .text("purpose", "fine-tune")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(filename)
                    .mime_str("application/jsonl")
                    .map_err(|e| ClientError::UnexpectedResponse(e.to_string()))?,
            );

        let response = self.post("/files").multipart(form).send().await?;
        let response = Self::check(response).await?;
        let file: FileObject = response.json().await?;
        Ok(file.id)
    }

    /// Submit a fine-tuning job for `base_model` over an uploaded file.
    pub async fn create_fine_tune(
        &self,
        training_file: &str,
        base_model: &str,
        suffix: Option<&str>,
    ) -> ClientResult<FineTuneJob> {
        let mut body = json!({
            "training_file": training_file,
            "model": base_model,
        });
        if let Some(suffix) = suffix {
            body["suffix"] = json!(suffix);
        }

        let response = self.post("/fine_tuning/jobs").json(&body).send().await?;
        let response = Self::check(response).await?;
        let job: JobObject = response.json().await?;

        info!(job_id = %job.id, base_model, "fine-tuning job created");
        Ok(job.into())
    }

    /// Read the current status of a fine-tuning job.
    pub async fn fine_tune_status(&self, job_id: &str) -> ClientResult<FineTuneJob> {
        let response = self.get(&format!("/fine_tuning/jobs/{job_id}")).send().await?;
        let response = Self::check(response).await?;
        let job: JobObject = response.json().await?;
        Ok(job.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_statuses_collapse_to_three_states() {
        assert_eq!(JobStatus::from_raw("queued"), JobStatus::Running);
        assert_eq!(JobStatus::from_raw("validating_files"), JobStatus::Running);
        assert_eq!(JobStatus::from_raw("running"), JobStatus::Running);
        assert_eq!(JobStatus::from_raw("succeeded"), JobStatus::Succeeded);
        assert_eq!(JobStatus::from_raw("failed"), JobStatus::Failed);
        assert_eq!(JobStatus::from_raw("cancelled"), JobStatus::Failed);
    }

    #[test]
    fn job_object_parses_and_converts() {
        let raw = r#"{
            "id": "ftjob-abc123",
            "status": "succeeded",
            "fine_tuned_model": "ft:gpt-4o-mini:winery::xyz",
            "error": null
        }"#;
        let job: FineTuneJob = serde_json::from_str::<JobObject>(raw).unwrap().into();
        assert_eq!(job.id, "ftjob-abc123");
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.fine_tuned_model.as_deref(), Some("ft:gpt-4o-mini:winery::xyz"));
        assert!(job.error.is_none());
    }

    #[test]
    fn failed_job_carries_error_message() {
        let raw = r#"{
            "id": "ftjob-bad",
            "status": "failed",
            "fine_tuned_model": null,
            "error": {"message": "training file has invalid records"}
        }"#;
        let job: FineTuneJob = serde_json::from_str::<JobObject>(raw).unwrap().into();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("training file has invalid records"));
    }
}
