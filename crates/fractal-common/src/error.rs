//! Error types for fractal-pipeline services.

use thiserror::Error;

/// Result type alias using PipelineError.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Primary error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    // === Message Errors ===
    #[error("Failed to decode message body: {0}")]
    DecodeError(String),

    // === Queue Errors ===
    #[error("Queue error: {0}")]
    QueueError(String),

    // === Enrichment Errors ===
    #[error("Lookup failed for '{id}': {message}")]
    LookupError { id: String, message: String },

    // === Rendering Errors ===
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Image encoding failed: {0}")]
    EncodeError(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::DecodeError(err.to_string())
    }
}
