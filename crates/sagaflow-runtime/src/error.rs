//! Workflow executor errors.

use thiserror::Error;

use sagaflow_protocols::{
    AgentError, EngineError, RegistryError, StepError, StoreError, WorkflowStatus,
};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Invalid step number {step}: workflow has {total} steps")]
    InvalidStep { step: usize, total: usize },

    #[error("Workflow {id} is already {status}")]
    WorkflowFinished { id: String, status: WorkflowStatus },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
