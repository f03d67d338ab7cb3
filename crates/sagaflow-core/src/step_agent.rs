//! Generic agent assembled from a step list and a scoring strategy.

#[cfg(test)]
#[path = "step_agent_tests.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sagaflow_protocols::{
    Agent, AgentError, AgentResult, CompensationDescriptor, CompensationReport, ResultKind, Step,
    Workflow,
};

use crate::agent_loop::AgentLoop;
use crate::executor::StepExecutor;
use crate::saga::{CompensationRegistry, SagaState};
use crate::scoring::{FixedScorer, Scorer};

/// An [`Agent`] that runs a fixed step list through [`AgentLoop`] and scores
/// the merged results.
///
/// Attaching a [`CompensationRegistry`] turns on saga mode: compensation
/// descriptors returned by steps are drained when a later step fails, the
/// run is cancelled or the overall timeout elapses.
pub struct StepAgent {
    id: String,
    agent_type: String,
    capabilities: Vec<String>,
    steps: Vec<Step>,
    result_kind: ResultKind,
    scorer: Arc<dyn Scorer>,
    default_artifacts: Vec<String>,
    timeout: Option<Duration>,
    compensations: Option<Arc<CompensationRegistry>>,
    executor: StepExecutor,
}

impl StepAgent {
    pub fn builder(
        id: impl Into<String>,
        agent_type: impl Into<String>,
        result_kind: ResultKind,
    ) -> StepAgentBuilder {
        StepAgentBuilder::new(id, agent_type, result_kind)
    }

    pub fn result_kind(&self) -> ResultKind {
        self.result_kind
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Artifacts of the run followed by the defaults, without duplicates.
    fn collect_artifacts(&self, produced: Vec<String>) -> Vec<String> {
        let mut artifacts = produced;
        for name in &self.default_artifacts {
            if !artifacts.contains(name) {
                artifacts.push(name.clone());
            }
        }
        artifacts
    }
}

#[async_trait]
impl Agent for StepAgent {
    fn id(&self) -> &str {
        &self.id
    }

    fn agent_type(&self) -> &str {
        &self.agent_type
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    fn steps(&self) -> &[Step] {
        &self.steps
    }

    async fn execute(
        &self,
        workflow: &Workflow,
        cancel: CancellationToken,
    ) -> Result<AgentResult, AgentError> {
        self.validate(workflow)?;

        info!(
            "Agent {} ({}) executing workflow {}",
            self.id, self.agent_type, workflow.id
        );

        let run_token = cancel.child_token();
        let deadline = self.timeout.map(|limit| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                token.cancel();
            })
        });

        let outcome = AgentLoop::new(&self.executor, &self.steps)
            .with_compensations(self.compensations.as_deref())
            .run(workflow, &run_token)
            .await;

        if let Some(task) = deadline {
            task.abort();
        }

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                let deadline_fired = run_token.is_cancelled() && !cancel.is_cancelled();
                return match self.timeout {
                    Some(limit) if deadline_fired => {
                        warn!("Agent {} timed out after {:?}: {}", self.id, limit, e);
                        Err(AgentError::Timeout(limit))
                    }
                    _ => Err(e),
                };
            }
        };

        let scores = self.scorer.score(&outcome.results);
        let elapsed_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX);
        let artifacts = self.collect_artifacts(outcome.artifacts);

        info!(
            "Agent {} completed workflow {} in {}ms (confidence {:.2}, quality {:.1})",
            self.id,
            workflow.id,
            elapsed_ms,
            scores.confidence(),
            scores.quality()
        );

        Ok(AgentResult::new(
            workflow.id.clone(),
            self.agent_type.clone(),
            self.result_kind,
            outcome.results,
            scores,
        )
        .with_execution_time_ms(elapsed_ms)
        .with_artifacts(artifacts))
    }

    fn supports_compensation(&self) -> bool {
        self.compensations.is_some()
    }

    async fn compensate(
        &self,
        workflow_id: &str,
        pending: Vec<(String, CompensationDescriptor)>,
    ) -> CompensationReport {
        match &self.compensations {
            Some(registry) => {
                SagaState::from_pending(workflow_id, pending)
                    .compensate(registry)
                    .await
            }
            None => CompensationReport::default(),
        }
    }
}

impl std::fmt::Debug for StepAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepAgent")
            .field("id", &self.id)
            .field("agent_type", &self.agent_type)
            .field("steps", &self.steps.len())
            .field("result_kind", &self.result_kind)
            .field("timeout", &self.timeout)
            .field("saga", &self.compensations.is_some())
            .finish()
    }
}

/// Builder for [`StepAgent`].
pub struct StepAgentBuilder {
    agent: StepAgent,
}

impl StepAgentBuilder {
    fn new(id: impl Into<String>, agent_type: impl Into<String>, result_kind: ResultKind) -> Self {
        Self {
            agent: StepAgent {
                id: id.into(),
                agent_type: agent_type.into(),
                capabilities: Vec::new(),
                steps: Vec::new(),
                result_kind,
                scorer: Arc::new(FixedScorer(Default::default())),
                default_artifacts: Vec::new(),
                timeout: None,
                compensations: None,
                executor: StepExecutor::default(),
            },
        }
    }

    pub fn capability(mut self, capability: impl Into<String>) -> Self {
        self.agent.capabilities.push(capability.into());
        self
    }

    pub fn capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agent
            .capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.agent.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.agent.steps.extend(steps);
        self
    }

    pub fn scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.agent.scorer = Arc::new(scorer);
        self
    }

    /// Artifact names reported on every successful run.
    pub fn artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agent
            .default_artifacts
            .extend(artifacts.into_iter().map(Into::into));
        self
    }

    /// Bound on the whole run.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.agent.timeout = Some(timeout);
        self
    }

    pub fn compensations(mut self, registry: CompensationRegistry) -> Self {
        self.agent.compensations = Some(Arc::new(registry));
        self
    }

    pub fn executor(mut self, executor: StepExecutor) -> Self {
        self.agent.executor = executor;
        self
    }

    pub fn build(self) -> StepAgent {
        self.agent
    }
}
