//! # Sagaflow Core
//!
//! Execution core of the Sagaflow framework.
//!
//! ## Features
//!
//! - Step execution with bounded retries, per-attempt timeouts and cancellation
//! - Saga state with a LIFO stack of compensation descriptors
//! - Generic step-list agent with pluggable scoring
//! - Agent registry resolving type tags to agent instances
//! - Template catalog producing workflow start requests

pub mod retry;
pub mod executor;
pub mod saga;
pub mod scoring;
pub mod agent_loop;
pub mod step_agent;
pub mod registry;
pub mod template;

pub use retry::RetryPolicy;
pub use executor::StepExecutor;
pub use saga::{CompensationRegistry, PendingCompensation, SagaState};
pub use scoring::{FixedScorer, Scorer};
pub use agent_loop::{AgentLoop, LoopOutcome};
pub use step_agent::{StepAgent, StepAgentBuilder};
pub use registry::AgentRegistry;
pub use template::TemplateManager;
