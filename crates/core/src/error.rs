//! Error types for Charter.
//!
//! One enum covers the whole taxonomy: hard failures of the offline build
//! (`InputRead`), failures of a single conversational turn (`Embedding`,
//! `Generation`, `Retrieval`, `Timeout`, `Cancelled`), and the supporting
//! configuration, prompt and serialization errors.

use thiserror::Error;

/// Unified error type for Charter.
///
/// All fallible functions return `Result<T, AppError>`.
/// Soft conditions (segmentation gaps, empty retrieval, history overflow)
/// are never represented here; they are logged and absorbed where they occur.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The source document could not be read; the build is aborted.
    #[error("Failed to read source document {path}: {reason}")]
    InputRead { path: String, reason: String },

    /// Transport-level failure talking to a model provider
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding model service failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Contextualization or answer generation failure
    #[error("Generation error: {0}")]
    Generation(String),

    /// Vector index query failure
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// An external call exceeded its deadline
    #[error("Timed out after {secs}s: {operation}")]
    Timeout { operation: String, secs: u64 },

    /// The index was built with a different embedding model than the one configured
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// The session was reset while the turn was in flight; the result was discarded
    #[error("Turn cancelled: session was reset while the query was in flight")]
    Cancelled,

    /// Knowledge base and index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Llm(_)
                | AppError::Embedding(_)
                | AppError::Generation(_)
                | AppError::Retrieval(_)
                | AppError::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
