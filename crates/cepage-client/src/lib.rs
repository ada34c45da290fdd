//! # cepage-client
//!
//! Client for an OpenAI-compatible hosted API, covering the three external
//! collaborators of a batch run:
//!
//! - **Inference** — chat completions with an enumeration-constrained JSON
//!   response format ([`chat`]), exposed to the dispatcher through
//!   [`LabelClassifier`].
//! - **Fine-tuning** — training-file upload plus an opaque long-running job
//!   with a `{running, succeeded, failed}` status ([`finetune`]).  Once a job
//!   succeeds, the resulting model id is just another inference collaborator.
//! - **Cost estimation** — token-count heuristics for pre-flight batch cost
//!   printouts ([`cost`]).

pub mod chat;
pub mod cost;
pub mod error;
pub mod finetune;

pub use chat::LabelClassifier;
pub use cost::{estimate_batch_cost, estimate_tokens, CostEstimate, Pricing};
pub use error::{ClientError, ClientResult};
pub use finetune::{FineTuneJob, JobStatus};

use serde::Deserialize;

/// Environment variables consulted for the bearer token, in order.
const API_KEY_VARS: [&str; 2] = ["CEPAGE_API_KEY", "OPENAI_API_KEY"];

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Authenticated handle to the hosted API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Create a client for `base_url` with an explicit bearer token.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("cepage/0.1")
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Create a client reading the token from `CEPAGE_API_KEY`, falling back
    /// to `OPENAI_API_KEY`.
    pub fn from_env(base_url: impl Into<String>) -> ClientResult<Self> {
        let key = API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
            .ok_or(ClientError::MissingApiKey("CEPAGE_API_KEY"))?;
        Self::new(base_url, key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(&self.api_key)
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(&self.api_key)
    }

    /// Check a response status, extracting the API's error message on
    /// failure.
    pub(crate) async fn check(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        Err(ClientError::Api { status: status.as_u16(), message })
    }
}

/// `{"error": {"message": …}}` envelope the API wraps failures in.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalised() {
        let client = ApiClient::new("https://api.example.com/v1/", "sk-test").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/v1");
        assert_eq!(client.url("/chat/completions"), "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn error_envelope_parses() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"rate_limit_error"}}"#;
        let parsed: ApiErrorBody = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Rate limit reached");
    }
}
