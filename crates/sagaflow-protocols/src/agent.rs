//! Agent protocol definitions.
//!
//! Agents are polymorphic workers that run a fixed, ordered list of steps
//! against a workflow.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::AgentError;
use crate::saga::{CompensationDescriptor, CompensationReport};
use crate::step::Step;
use crate::types::{AgentResult, Workflow};

/// Core trait for agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Returns the agent instance ID.
    fn id(&self) -> &str;

    /// Returns the agent type tag.
    fn agent_type(&self) -> &str;

    /// Capability tags advertised by this agent.
    fn capabilities(&self) -> &[String];

    /// Steps in execution order.
    fn steps(&self) -> &[Step];

    /// Check that the workflow can be handled by this agent.
    fn validate(&self, workflow: &Workflow) -> Result<(), AgentError> {
        if workflow.workflow_type != self.agent_type() {
            return Err(AgentError::InvalidWorkflow(format!(
                "workflow type '{}' does not match agent type '{}'",
                workflow.workflow_type,
                self.agent_type()
            )));
        }
        Ok(())
    }

    /// Run every step of the workflow and produce a result.
    async fn execute(
        &self,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> Result<AgentResult, AgentError>;

    /// Whether this agent registers compensations for its steps.
    fn supports_compensation(&self) -> bool {
        false
    }

    /// Drain previously recorded compensations, newest first.
    ///
    /// `pending` is in registration order as `(step name, descriptor)`.
    async fn compensate(
        &self,
        workflow_id: &str,
        pending: Vec<(String, CompensationDescriptor)>,
    ) -> CompensationReport {
        let _ = (workflow_id, pending);
        CompensationReport::default()
    }
}

/// Constructor of agent instances, keyed by type in the registry.
///
/// Must be a pure construction step without I/O.
pub type AgentFactory = Arc<dyn Fn(&str) -> Arc<dyn Agent> + Send + Sync>;

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
