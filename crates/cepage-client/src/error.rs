use thiserror::Error;

use cepage_core::ClassifyError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No API key found: set {0}")]
    MissingApiKey(&'static str),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Classify a client error into the dispatcher's per-item taxonomy.
///
/// Anything the upstream service or the network did wrong is transient;
/// anything wrong with the *shape* of an otherwise-delivered response is
/// malformed.
impl From<ClientError> for ClassifyError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Json(e) => ClassifyError::Malformed(e.to_string()),
            ClientError::UnexpectedResponse(msg) => ClassifyError::Malformed(msg),
            other => ClassifyError::Transient(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_errors_map_to_malformed() {
        let err = ClientError::UnexpectedResponse("no choices".into());
        assert!(matches!(ClassifyError::from(err), ClassifyError::Malformed(_)));
    }

    #[test]
    fn api_errors_map_to_transient() {
        let err = ClientError::Api { status: 503, message: "overloaded".into() };
        assert!(matches!(ClassifyError::from(err), ClassifyError::Transient(_)));
    }
}
