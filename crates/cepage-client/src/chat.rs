//! Chat-completions calls with enumeration-constrained output.
//!
//! Each classification request carries a JSON-schema response format whose
//! single `label` property is restricted to the batch's allowed label
//! enumeration, so a well-behaved service can only answer with one of the
//! expected labels.  The dispatcher re-checks membership regardless.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use cepage_core::{ClassifyError, Classifier, LabelSet, WorkItem};

use crate::error::{ClientError, ClientResult};
use crate::ApiClient;

// ─── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Parsed form of the constrained response content.
#[derive(Debug, Deserialize)]
struct LabelAnswer {
    label: String,
}

// ─── Client calls ─────────────────────────────────────────────────────────────

impl ApiClient {
    /// Ask `model` to classify `prompt` into one of `labels`.
    ///
    /// Greedy decoding (temperature 0) — diversity is not wanted for
    /// classification.  When `labels` is empty the response format is left
    /// unconstrained and the raw answer is returned.
    pub async fn classify_text(
        &self,
        model: &str,
        prompt: &str,
        labels: &LabelSet,
    ) -> ClientResult<String> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage { role: "user".into(), content: prompt.to_string() }],
            temperature: 0.0,
            max_tokens: 64,
            response_format: label_schema(labels),
        };

        let response = self.post("/chat/completions").json(&request).send().await?;
        let response = Self::check(response).await?;
        let parsed: ChatCompletionResponse = response.json().await?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ClientError::UnexpectedResponse("response has no choices".into()))?;

        let label = parse_label(content)?;
        debug!(model, label = %label, "classification response");
        Ok(label)
    }
}

/// Build the `response_format` value constraining the answer to the
/// enumeration.  `None` when the set is empty.
fn label_schema(labels: &LabelSet) -> Option<serde_json::Value> {
    if labels.is_empty() {
        return None;
    }
    Some(json!({
        "type": "json_schema",
        "json_schema": {
            "name": "classification",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "label": { "type": "string", "enum": labels.as_slice() }
                },
                "required": ["label"],
                "additionalProperties": false
            }
        }
    }))
}

/// Extract the single label from a response body.
///
/// Accepts the structured `{"label": …}` object; falls back to treating the
/// trimmed content as a bare label for models that ignore the response
/// format.  An empty answer is a shape error.
fn parse_label(content: &str) -> ClientResult<String> {
    let trimmed = content.trim();
    if let Ok(answer) = serde_json::from_str::<LabelAnswer>(trimmed) {
        return Ok(answer.label);
    }
    if trimmed.is_empty() {
        return Err(ClientError::UnexpectedResponse("empty response content".into()));
    }
    Ok(trimmed.to_string())
}

// ─── Dispatcher collaborator ──────────────────────────────────────────────────

/// A model tier bound to a label enumeration, usable as the dispatcher's
/// inference collaborator.
#[derive(Debug, Clone)]
pub struct LabelClassifier {
    client: ApiClient,
    model: String,
    labels: LabelSet,
}

impl LabelClassifier {
    pub fn new(client: ApiClient, model: impl Into<String>, labels: LabelSet) -> Self {
        Self { client, model: model.into(), labels }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Classifier for LabelClassifier {
    async fn classify(&self, item: &WorkItem) -> Result<String, ClassifyError> {
        self.client
            .classify_text(&self.model, &item.input, &self.labels)
            .await
            .map_err(ClassifyError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_structured_label() {
        assert_eq!(parse_label(r#"{"label":"Pinot Noir"}"#).unwrap(), "Pinot Noir");
    }

    #[test]
    fn falls_back_to_bare_label() {
        assert_eq!(parse_label("  Riesling\n").unwrap(), "Riesling");
    }

    #[test]
    fn empty_content_is_a_shape_error() {
        assert!(matches!(
            parse_label("   "),
            Err(ClientError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn schema_embeds_the_enumeration() {
        let labels = LabelSet::new(["Merlot", "Syrah"]);
        let schema = label_schema(&labels).unwrap();
        let expected = json!(["Merlot", "Syrah"]);
        assert_eq!(
            schema["json_schema"]["schema"]["properties"]["label"]["enum"],
            expected
        );
    }

    #[test]
    fn empty_enumeration_leaves_format_unconstrained() {
        assert!(label_schema(&LabelSet::default()).is_none());
    }

    #[test]
    fn request_serialisation_omits_missing_format() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage { role: "user".into(), content: "hi".into() }],
            temperature: 0.0,
            max_tokens: 64,
            response_format: None,
        };
        let v = serde_json::to_value(&request).unwrap();
        assert_eq!(v["model"], "gpt-4o-mini");
        assert!(v.get("response_format").is_none());
    }
}
