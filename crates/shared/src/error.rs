use serde::{Deserialize, Serialize};

/// The full evaluation-engine error taxonomy. Explicit serde tagging keeps
/// the wire shape stable (`{"type": "...", "detail": ...}`) regardless of
/// how the variant payload evolves.
#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Activity schema error in {activity_id}: {message}")]
    ActivitySchemaError { activity_id: String, message: String },

    #[error("Submission validation error: {0}")]
    SubmissionValidationError(String),

    #[error("LLM provider '{provider}' failed: {message}")]
    LLMProviderError { provider: String, message: String },

    #[error("All LLM providers failed: {0:?}")]
    LLMAggregateError(Vec<String>),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::ParseError(err.to_string())
    }
}
