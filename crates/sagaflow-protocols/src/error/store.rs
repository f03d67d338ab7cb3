//! Persistence errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("No step record for workflow {workflow_id} step {step_number}")]
    StepNotFound {
        workflow_id: String,
        step_number: usize,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
