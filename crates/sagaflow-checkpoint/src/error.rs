//! Checkpoint errors.

use thiserror::Error;

use sagaflow_protocols::EngineError;

/// Checkpoint error types.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Checkpoint not found.
    #[error("Checkpoint not found: {0}")]
    NotFound(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Recovery failed.
    #[error("Recovery failed: {0}")]
    RecoveryFailed(String),
}

impl From<CheckpointError> for EngineError {
    fn from(e: CheckpointError) -> Self {
        EngineError::Checkpoint(e.to_string())
    }
}
