//! How an agent run is carried out: in-process or through a durable engine.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use sagaflow_core::AgentRegistry;
use sagaflow_protocols::{
    Agent, AgentError, AgentResult, DurableContext, DurableEngine, EngineError, Workflow,
    WorkflowFn,
};

use crate::error::ExecutorError;

/// Name under which [`DurableStrategy`] registers its workflow function.
pub const AGENT_WORKFLOW: &str = "agent-workflow";

/// Runs a resolved agent against a workflow.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        agent: Arc<dyn Agent>,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> Result<AgentResult, ExecutorError>;
}

/// Calls [`Agent::execute`] directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectStrategy;

#[async_trait]
impl ExecutionStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn run(
        &self,
        agent: Arc<dyn Agent>,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> Result<AgentResult, ExecutorError> {
        Ok(agent.execute(workflow, cancel).await?)
    }
}

/// Delegates runs to a [`DurableEngine`], one run per workflow ID.
///
/// The registered function receives the serialized workflow, resolves the
/// agent from the registry itself and returns the serialized result, so a
/// resumed run needs nothing but its checkpointed input.
pub struct DurableStrategy {
    engine: Arc<dyn DurableEngine>,
}

impl DurableStrategy {
    pub fn new(
        engine: Arc<dyn DurableEngine>,
        registry: Arc<AgentRegistry>,
    ) -> Result<Self, ExecutorError> {
        engine.register_workflow(AGENT_WORKFLOW, agent_workflow(registry))?;
        Ok(Self { engine })
    }
}

fn agent_workflow(registry: Arc<AgentRegistry>) -> WorkflowFn {
    Arc::new(move |ctx: DurableContext| {
        let registry = Arc::clone(&registry);
        async move {
            let workflow: Workflow = serde_json::from_value(ctx.input)?;
            debug!(
                "Durable run '{}' attempt {} for workflow {}",
                ctx.run_id, ctx.attempt, workflow.id
            );

            let agent = registry
                .get(&workflow.workflow_type, &workflow.agent_id)
                .map_err(|e| EngineError::WorkflowFailed(e.to_string()))?;
            let result = agent.execute(&workflow, ctx.cancel).await.map_err(run_error)?;

            Ok(serde_json::to_value(result)?)
        }
        .boxed()
    })
}

/// A compensated run is final: resuming it would redo work already rolled back.
fn run_error(e: AgentError) -> EngineError {
    match e {
        AgentError::Compensated { .. } | AgentError::CompensationFailed { .. } => {
            EngineError::RolledBack(e.to_string())
        }
        other => EngineError::WorkflowFailed(other.to_string()),
    }
}

#[async_trait]
impl ExecutionStrategy for DurableStrategy {
    fn name(&self) -> &'static str {
        "durable"
    }

    async fn run(
        &self,
        _agent: Arc<dyn Agent>,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> Result<AgentResult, ExecutorError> {
        let input = serde_json::to_value(workflow)?;
        let handle = self
            .engine
            .execute(AGENT_WORKFLOW, &workflow.id, input, cancel)
            .await?;
        info!("Workflow {} handed to durable run '{}'", workflow.id, handle.run_id());
        Ok(handle.get::<AgentResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sagaflow_protocols::StepError;

    #[test]
    fn test_compensated_run_error_is_final() {
        let compensated = run_error(AgentError::Compensated {
            step: "publish".to_string(),
            attempted: 2,
            source: StepError::failed("publish exploded"),
        });
        assert!(matches!(compensated, EngineError::RolledBack(_)));
        assert!(compensated.is_final());

        let partial = run_error(AgentError::CompensationFailed {
            step: "publish".to_string(),
            failures: vec!["collect: disk gone".to_string()],
            source: StepError::failed("publish exploded"),
        });
        assert!(partial.is_final());

        let plain = run_error(AgentError::StepFailed {
            step: "collect".to_string(),
            source: StepError::failed("no input"),
        });
        assert!(matches!(plain, EngineError::WorkflowFailed(_)));
        assert!(!plain.is_final());
    }
}
