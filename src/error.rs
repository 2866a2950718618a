//! Error types for the evaluation harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while loading, reconciling or evaluating.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Structural violation in the gold standard (missing `queries`,
    /// missing or duplicate query number).
    #[error("Malformed gold standard: {0}")]
    MalformedGoldStandard(String),

    /// Structural violation in a result record set.
    #[error("Malformed result set: {0}")]
    MalformedResults(String),

    /// A query number with no gold-standard entry.
    #[error("Unknown query number {number} ({context}): not present in the gold standard")]
    UnknownQueryNumber { number: u32, context: String },

    /// Failure reported by the retrieval collaborator.
    #[error("Retrieval backend error: {0}")]
    RetrievalBackend(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM reply that holds no usable JSON object.
    #[error("Malformed LLM reply: {0}")]
    MalformedReply(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unknown query number error with a description of where
    /// the number came from.
    pub fn unknown_query(number: u32, context: impl Into<String>) -> Self {
        Self::UnknownQueryNumber {
            number,
            context: context.into(),
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_query_message_names_number() {
        let err = EvalError::unknown_query(99, "requested for evaluation");
        let msg = err.to_string();
        assert!(msg.contains("99"));
        assert!(msg.contains("requested for evaluation"));
    }
}
