//! # Sagaflow Protocols
//!
//! Core protocol definitions (traits and data types) for the Sagaflow
//! workflow framework. Contains only interface definitions, no orchestration.
//!
//! ## Core Traits
//!
//! - [`Agent`] - Polymorphic worker running an ordered list of steps
//! - [`StepHandler`] - Body of a retryable, timeout-bounded step
//! - [`CompensationHandler`] - Interpreter of saga compensation descriptors
//! - [`WorkflowStore`] - Persistence collaborator for workflow bookkeeping
//! - [`DurableEngine`] - Checkpointing execution engine collaborator

pub mod error;
pub mod types;
pub mod step;
pub mod saga;
pub mod agent;
pub mod store;
pub mod engine;

pub use agent::{Agent, AgentFactory};
pub use engine::{DurableContext, DurableEngine, WorkflowFn, WorkflowHandle};
pub use error::{
    AgentError, CompensationError, EngineError, RegistryError, StepError, StoreError,
    TemplateError,
};
pub use saga::{
    CompensationDescriptor, CompensationFailure, CompensationHandler, CompensationReport, SagaView,
};
pub use step::{FnStep, Step, StepContext, StepHandler, StepInput, StepOutput};
pub use store::WorkflowStore;
pub use types::*;

pub use tokio_util::sync::CancellationToken;
