//! Workflow executor: lifecycle, persistence and step-by-step execution.

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sagaflow_core::{AgentRegistry, StepExecutor};
use sagaflow_protocols::{
    Agent, AgentError, AgentResult, SagaView, StartWorkflowRequest, StepInput, StepOutput,
    StepRecord, Values, Workflow, WorkflowHandle, WorkflowProgress, WorkflowStatus, WorkflowStore,
    merge_values,
};

use crate::error::ExecutorError;
use crate::strategy::ExecutionStrategy;

/// Drives workflows through their agents and keeps the store up to date.
pub struct WorkflowExecutor {
    registry: Arc<AgentRegistry>,
    store: Arc<dyn WorkflowStore>,
    strategy: Arc<dyn ExecutionStrategy>,
    step_executor: StepExecutor,
}

impl WorkflowExecutor {
    pub fn new(
        registry: Arc<AgentRegistry>,
        store: Arc<dyn WorkflowStore>,
        strategy: Arc<dyn ExecutionStrategy>,
    ) -> Self {
        Self {
            registry,
            store,
            strategy,
            step_executor: StepExecutor::default(),
        }
    }

    /// Executor used by [`execute_workflow_step`](Self::execute_workflow_step).
    pub fn with_step_executor(mut self, step_executor: StepExecutor) -> Self {
        self.step_executor = step_executor;
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Create and persist a pending workflow.
    pub async fn start_workflow(
        &self,
        request: StartWorkflowRequest,
    ) -> Result<Workflow, ExecutorError> {
        let workflow = Workflow::from_request(request);
        self.store.create_workflow(&workflow).await?;
        self.store
            .upsert_progress(&WorkflowProgress::pending(workflow.id.clone()))
            .await?;

        info!(
            "Started workflow {} ('{}', type {})",
            workflow.id, workflow.title, workflow.workflow_type
        );
        Ok(workflow)
    }

    pub async fn get_workflow(&self, workflow_id: &str) -> Result<Workflow, ExecutorError> {
        self.store
            .get_workflow(workflow_id)
            .await?
            .ok_or_else(|| ExecutorError::WorkflowNotFound(workflow_id.to_string()))
    }

    /// Run every step of a stored workflow with its agent.
    pub async fn execute_workflow(
        &self,
        workflow_id: &str,
        cancel: CancellationToken,
    ) -> Result<AgentResult, ExecutorError> {
        let mut workflow = self.get_workflow(workflow_id).await?;

        let agent = match self.resolve_agent(&workflow) {
            Ok(agent) => agent,
            Err(e) => {
                self.fail_workflow(workflow_id, &e.to_string()).await;
                return Err(e);
            }
        };

        let steps = agent.steps();
        let total = steps.len();
        let first = steps.first().map(|s| s.name.clone()).unwrap_or_default();
        let last = steps.last().map(|s| s.name.clone()).unwrap_or_default();

        self.store
            .update_status(workflow_id, WorkflowStatus::Active, None)
            .await?;
        self.store
            .upsert_progress(&WorkflowProgress::at_step(
                workflow_id,
                0,
                total,
                first,
                WorkflowStatus::Active,
            ))
            .await?;
        workflow.status = WorkflowStatus::Active;

        info!(
            "Executing workflow {} with agent {} ({} strategy)",
            workflow_id,
            agent.id(),
            self.strategy.name()
        );

        match self.strategy.run(agent, &workflow, cancel).await {
            Ok(result) => {
                if let Err(e) = self.record_completion(workflow_id, &result, total, last).await {
                    error!("Workflow {} finished but could not be recorded: {}", workflow_id, e);
                    self.fail_workflow(workflow_id, &e.to_string()).await;
                    return Err(e);
                }

                info!(
                    "Workflow {} completed (confidence {:.2}, quality {:.1})",
                    workflow_id,
                    result.confidence_score(),
                    result.quality_score()
                );
                Ok(result)
            }
            Err(e) => {
                error!("Workflow {} failed: {}", workflow_id, e);
                self.fail_workflow(workflow_id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Record the outcome of a durable run resumed outside
    /// [`execute_workflow`](Self::execute_workflow), such as at startup.
    pub async fn finish_resumed(
        &self,
        handle: WorkflowHandle,
    ) -> Result<AgentResult, ExecutorError> {
        let run_id = handle.run_id().to_string();
        let result = match handle.get::<AgentResult>().await {
            Ok(result) => result,
            Err(e) => {
                warn!("Resumed run '{}' failed: {}", run_id, e);
                self.fail_workflow(&run_id, &e.to_string()).await;
                return Err(e.into());
            }
        };

        let (total, last) = self.step_span(&run_id).await;
        if let Err(e) = self.record_completion(&run_id, &result, total, last).await {
            error!("Resumed run '{}' finished but could not be recorded: {}", run_id, e);
            self.fail_workflow(&run_id, &e.to_string()).await;
            return Err(e);
        }
        info!("Resumed run '{}' completed", run_id);
        Ok(result)
    }

    /// Run a single step (1-based) of a stored workflow.
    ///
    /// Earlier steps' outputs are read back from the step log. When the step
    /// fails and the agent supports compensation, the compensations recorded
    /// by earlier steps are replayed newest-first.
    ///
    /// Completed, failed and cancelled workflows are rejected; a failed
    /// workflow has already been rolled back.
    pub async fn execute_workflow_step(
        &self,
        workflow_id: &str,
        step_number: usize,
        cancel: CancellationToken,
    ) -> Result<StepOutput, ExecutorError> {
        let workflow = self.get_workflow(workflow_id).await?;
        if workflow.status.is_terminal() {
            return Err(ExecutorError::WorkflowFinished {
                id: workflow.id,
                status: workflow.status,
            });
        }
        let agent = self.resolve_agent(&workflow)?;

        let steps = agent.steps();
        let total = steps.len();
        if step_number == 0 || step_number > total {
            return Err(ExecutorError::InvalidStep {
                step: step_number,
                total,
            });
        }
        let step = &steps[step_number - 1];

        let prior = self.prior_outputs(workflow_id, step_number).await?;
        let mut results = Values::new();
        for (_, output) in prior.values() {
            merge_values(&mut results, &output.values);
        }
        let saga = agent.supports_compensation().then(|| SagaView {
            steps_completed: prior.values().map(|(name, _)| name.clone()).collect(),
            artifacts: prior.values().flat_map(|(_, o)| o.artifacts.clone()).collect(),
            pending_compensations: prior.values().filter(|(_, o)| o.compensation.is_some()).count(),
        });

        if workflow.status == WorkflowStatus::Pending {
            self.store
                .update_status(workflow_id, WorkflowStatus::Active, None)
                .await?;
        }

        let input = StepInput {
            workflow_id: workflow_id.to_string(),
            step_number,
            total_steps: total,
            variables: workflow.variables.clone(),
            results,
            saga,
        };

        self.store
            .record_step_start(&StepRecord::started(workflow_id, step_number, step.name.clone()))
            .await?;

        match self.step_executor.execute(step, input, &cancel).await {
            Ok(output) => {
                let flattened = match serde_json::to_value(&output)? {
                    serde_json::Value::Object(map) => map,
                    _ => output.values.clone(),
                };
                self.store
                    .record_step_success(
                        workflow_id,
                        step_number,
                        &flattened,
                        output.compensation.as_ref(),
                    )
                    .await?;

                let status = if step_number == total {
                    WorkflowStatus::Completed
                } else {
                    WorkflowStatus::Active
                };
                self.store
                    .upsert_progress(&WorkflowProgress::at_step(
                        workflow_id,
                        step_number,
                        total,
                        step.name.clone(),
                        status,
                    ))
                    .await?;
                if status == WorkflowStatus::Completed {
                    self.store.update_status(workflow_id, status, None).await?;
                }

                info!(
                    "Workflow {} step {}/{} '{}' completed",
                    workflow_id, step_number, total, step.name
                );
                Ok(output)
            }
            Err(source) => {
                error!(
                    "Workflow {} step {}/{} '{}' failed: {}",
                    workflow_id, step_number, total, step.name, source
                );
                if let Err(e) = self
                    .store
                    .record_step_failure(workflow_id, step_number, &source.to_string())
                    .await
                {
                    warn!("Failed to record step failure for {}: {}", workflow_id, e);
                }

                let step_name = step.name.clone();
                let err = if agent.supports_compensation() {
                    let pending: Vec<_> = prior
                        .into_values()
                        .filter_map(|(name, output)| output.compensation.map(|c| (name, c)))
                        .collect();
                    let report = agent.compensate(workflow_id, pending).await;
                    if report.is_clean() {
                        AgentError::Compensated {
                            step: step_name,
                            attempted: report.attempted(),
                            source,
                        }
                    } else {
                        AgentError::CompensationFailed {
                            step: step_name,
                            failures: report.failures.iter().map(ToString::to_string).collect(),
                            source,
                        }
                    }
                } else {
                    AgentError::StepFailed {
                        step: step_name,
                        source,
                    }
                };

                self.fail_workflow(workflow_id, &err.to_string()).await;
                Err(err.into())
            }
        }
    }

    /// Stored progress, or a pending record when there is none.
    pub async fn get_workflow_progress(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowProgress, ExecutorError> {
        Ok(self
            .store
            .get_progress(workflow_id)
            .await?
            .unwrap_or_else(|| WorkflowProgress::pending(workflow_id)))
    }

    pub async fn get_results(&self, workflow_id: &str) -> Result<Vec<AgentResult>, ExecutorError> {
        Ok(self.store.results(workflow_id).await?)
    }

    fn resolve_agent(&self, workflow: &Workflow) -> Result<Arc<dyn Agent>, ExecutorError> {
        Ok(self.registry.get(&workflow.workflow_type, &workflow.agent_id)?)
    }

    /// Newest successful output of each step before `step_number`, keyed by step.
    async fn prior_outputs(
        &self,
        workflow_id: &str,
        step_number: usize,
    ) -> Result<BTreeMap<usize, (String, StepOutput)>, ExecutorError> {
        let mut prior = BTreeMap::new();
        for record in self.store.step_records(workflow_id).await? {
            if !record.success || record.step_number >= step_number {
                continue;
            }
            let mut output: StepOutput = match record.output {
                Some(values) => serde_json::from_value(serde_json::Value::Object(values))?,
                None => StepOutput::default(),
            };
            if output.compensation.is_none() {
                output.compensation = record.compensation;
            }
            prior.insert(record.step_number, (record.step_name, output));
        }
        Ok(prior)
    }

    /// Step count and last step name of a workflow's agent, falling back to
    /// its stored progress when the agent cannot be resolved.
    async fn step_span(&self, workflow_id: &str) -> (usize, String) {
        let agent = match self.get_workflow(workflow_id).await {
            Ok(workflow) => self.resolve_agent(&workflow).ok(),
            Err(_) => None,
        };
        if let Some(agent) = agent {
            let steps = agent.steps();
            return (steps.len(), steps.last().map(|s| s.name.clone()).unwrap_or_default());
        }
        match self.store.get_progress(workflow_id).await {
            Ok(Some(progress)) => (progress.total_steps, progress.current_step_name),
            _ => (0, String::new()),
        }
    }

    async fn record_completion(
        &self,
        workflow_id: &str,
        result: &AgentResult,
        total: usize,
        last: String,
    ) -> Result<(), ExecutorError> {
        self.store.store_result(result).await?;
        self.store
            .update_status(workflow_id, WorkflowStatus::Completed, None)
            .await?;
        let mut progress =
            WorkflowProgress::at_step(workflow_id, total, total, last, WorkflowStatus::Completed);
        progress.progress_percent = 100.0;
        self.store.upsert_progress(&progress).await?;
        Ok(())
    }

    /// Mark a workflow failed; store errors here are logged, not returned.
    async fn fail_workflow(&self, workflow_id: &str, message: &str) {
        if let Err(e) = self
            .store
            .update_status(workflow_id, WorkflowStatus::Failed, Some(message))
            .await
        {
            warn!("Failed to mark workflow {} failed: {}", workflow_id, e);
        }

        let mut progress = match self.store.get_progress(workflow_id).await {
            Ok(Some(progress)) => progress,
            Ok(None) => WorkflowProgress::pending(workflow_id),
            Err(e) => {
                warn!("Failed to load progress of workflow {}: {}", workflow_id, e);
                WorkflowProgress::pending(workflow_id)
            }
        };
        progress.status = WorkflowStatus::Failed;
        progress.updated_at = Utc::now();
        if let Err(e) = self.store.upsert_progress(&progress).await {
            warn!("Failed to record progress of workflow {}: {}", workflow_id, e);
        }
    }
}
