//! The sequential step loop shared by every agent.
//!
//! Steps run in declaration order. Each step sees the merged outputs of the
//! steps before it; a failing step stops the run. With a compensation
//! registry attached the loop runs in saga mode: descriptors returned by
//! successful steps are stacked and drained newest-first when a later step
//! fails or the run is cancelled.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use sagaflow_protocols::{AgentError, Step, StepInput, Values, Workflow, merge_values};

use crate::executor::StepExecutor;
use crate::saga::{CompensationRegistry, SagaState};

/// What a completed run produced.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// Outputs of all steps, merged last-write-wins.
    pub results: Values,
    pub artifacts: Vec<String>,
    pub steps_completed: Vec<String>,
    pub elapsed: Duration,
}

/// Runs a step list against one workflow.
pub struct AgentLoop<'a> {
    executor: &'a StepExecutor,
    steps: &'a [Step],
    compensations: Option<&'a CompensationRegistry>,
}

impl<'a> AgentLoop<'a> {
    pub fn new(executor: &'a StepExecutor, steps: &'a [Step]) -> Self {
        Self {
            executor,
            steps,
            compensations: None,
        }
    }

    /// Enable saga mode.
    pub fn with_compensations(mut self, compensations: Option<&'a CompensationRegistry>) -> Self {
        self.compensations = compensations;
        self
    }

    pub async fn run(
        &self,
        workflow: &Workflow,
        cancel: &CancellationToken,
    ) -> Result<LoopOutcome, AgentError> {
        let started = Instant::now();
        let total = self.steps.len();
        let mut results = Values::new();
        let mut saga = SagaState::new(workflow.id.clone());

        for (index, step) in self.steps.iter().enumerate() {
            let input = StepInput {
                workflow_id: workflow.id.clone(),
                step_number: index + 1,
                total_steps: total,
                variables: workflow.variables.clone(),
                results: results.clone(),
                saga: self.compensations.map(|_| saga.view()),
            };

            debug!(
                "Workflow {}: step {}/{} '{}'",
                workflow.id,
                index + 1,
                total,
                step.name
            );

            match self.executor.execute(step, input, cancel).await {
                Ok(output) => {
                    merge_values(&mut results, &output.values);
                    saga.record_success(&step.name, &output);
                }
                Err(source) => {
                    error!("Workflow {} failed at step '{}': {}", workflow.id, step.name, source);
                    let step = step.name.clone();

                    let Some(registry) = self.compensations else {
                        return Err(AgentError::StepFailed { step, source });
                    };

                    let report = saga.compensate(registry).await;
                    if report.is_clean() {
                        info!(
                            "Workflow {} rolled back {} compensations",
                            workflow.id,
                            report.attempted()
                        );
                        return Err(AgentError::Compensated {
                            step,
                            attempted: report.attempted(),
                            source,
                        });
                    }
                    return Err(AgentError::CompensationFailed {
                        step,
                        failures: report.failures.iter().map(ToString::to_string).collect(),
                        source,
                    });
                }
            }
        }

        let steps_completed = saga.steps_completed().to_vec();
        Ok(LoopOutcome {
            results,
            artifacts: saga.into_artifacts(),
            steps_completed,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use serde_json::json;

    use sagaflow_protocols::{StepError, StepOutput};

    fn workflow() -> Workflow {
        Workflow::new("wf-1", "test", "test-1", Values::new())
    }

    #[tokio::test]
    async fn test_results_merge_last_write_wins() {
        let steps = vec![
            Step::from_fn("s1", "", |_ctx, _input| async {
                Ok::<_, StepError>(StepOutput::new().with("a", 1))
            }),
            Step::from_fn("s2", "", |_ctx, _input| async {
                Ok::<_, StepError>(StepOutput::new().with("a", 2).with("b", 3))
            }),
        ];
        let executor = StepExecutor::default();

        let outcome = AgentLoop::new(&executor, &steps)
            .run(&workflow(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(serde_json::Value::Object(outcome.results), json!({"a": 2, "b": 3}));
        assert_eq!(outcome.steps_completed, vec!["s1", "s2"]);
    }

    #[tokio::test]
    async fn test_later_steps_observe_earlier_results() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let steps = vec![
            Step::from_fn("produce", "", |_ctx, _input| async {
                Ok::<_, StepError>(StepOutput::new().with("count", 7))
            }),
            Step::from_fn("consume", "", move |_ctx, input: StepInput| {
                let record = record.clone();
                async move {
                    record.lock().push((input.step_number, input.total_steps, input.result("count").cloned()));
                    Ok::<_, StepError>(StepOutput::new())
                }
            }),
        ];
        let executor = StepExecutor::default();

        AgentLoop::new(&executor, &steps)
            .run(&workflow(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![(2, 2, Some(json!(7)))]);
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_steps() {
        let ran_third = Arc::new(Mutex::new(false));
        let flag = ran_third.clone();
        let steps = vec![
            Step::from_fn("ok", "", |_ctx, _input| async { Ok::<_, StepError>(StepOutput::new()) }),
            Step::from_fn("broken", "", |_ctx, _input| async {
                Err::<StepOutput, _>(StepError::failed("boom"))
            }),
            Step::from_fn("never", "", move |_ctx, _input| {
                let flag = flag.clone();
                async move {
                    *flag.lock() = true;
                    Ok::<_, StepError>(StepOutput::new())
                }
            }),
        ];
        let executor = StepExecutor::default();

        let err = AgentLoop::new(&executor, &steps)
            .run(&workflow(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::StepFailed { ref step, .. } if step == "broken"));
        assert!(!*ran_third.lock());
    }

    #[tokio::test]
    async fn test_saga_view_only_in_saga_mode() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let steps = vec![Step::from_fn("peek", "", move |_ctx, input: StepInput| {
            let record = record.clone();
            async move {
                record.lock().push(input.saga.is_some());
                Ok::<_, StepError>(StepOutput::new())
            }
        })];
        let executor = StepExecutor::default();
        let registry = CompensationRegistry::new();

        AgentLoop::new(&executor, &steps)
            .run(&workflow(), &CancellationToken::new())
            .await
            .unwrap();
        AgentLoop::new(&executor, &steps)
            .with_compensations(Some(&registry))
            .run(&workflow(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*seen.lock(), vec![false, true]);
    }
}
