//! # Sagaflow Runtime
//!
//! Workflow executor for Sagaflow.
//!
//! ## Features
//!
//! - Workflow lifecycle with persisted status, progress and results
//! - Whole-workflow execution through a pluggable [`ExecutionStrategy`]
//! - Step-by-step execution with saga rollback from the step log

pub mod error;
pub mod strategy;
pub mod executor;

pub use error::ExecutorError;
pub use strategy::{AGENT_WORKFLOW, DirectStrategy, DurableStrategy, ExecutionStrategy};
pub use executor::WorkflowExecutor;
