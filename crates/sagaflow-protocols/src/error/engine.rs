//! Durable engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Workflow function not registered: {0}")]
    NotRegistered(String),

    #[error("Workflow run failed: {0}")]
    WorkflowFailed(String),

    /// The run failed and its completed work was compensated; it must not be resumed.
    #[error("Workflow run rolled back: {0}")]
    RolledBack(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Workflow run '{0}' was interrupted before producing a result")]
    Interrupted(String),
}

impl EngineError {
    /// Whether the run's outcome is final even if it ended under cancellation.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::RolledBack(_))
    }
}
