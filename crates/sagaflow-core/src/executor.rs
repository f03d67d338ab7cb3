//! Step executor - runs one step with retries, timeouts and cancellation.

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use sagaflow_protocols::{Step, StepContext, StepError, StepInput, StepOutput};

use crate::retry::RetryPolicy;

/// Stateless step runner, safe to share across steps and workflows.
#[derive(Debug, Clone, Default)]
pub struct StepExecutor {
    policy: RetryPolicy,
    default_timeout: Option<Duration>,
}

impl StepExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            default_timeout: None,
        }
    }

    /// Timeout applied to steps that declare none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `step` up to `retry_count + 1` times.
    ///
    /// Returns the output of the first successful attempt. Cancelling
    /// `cancel` aborts the running attempt and any pending retry wait and
    /// yields [`StepError::Cancelled`]. When every attempt fails the last
    /// error is returned wrapped in [`StepError::Exhausted`].
    pub async fn execute(
        &self,
        step: &Step,
        input: StepInput,
        cancel: &CancellationToken,
    ) -> Result<StepOutput, StepError> {
        let attempts = step.max_attempts();
        let timeout = step.timeout.or(self.default_timeout);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return Err(StepError::Cancelled);
            }

            debug!("Executing step '{}' (attempt {}/{})", step.name, attempt, attempts);

            match self.attempt(step, input.clone(), attempt, timeout, cancel).await {
                Ok(output) => return Ok(output),
                Err(StepError::Cancelled) if cancel.is_cancelled() => {
                    warn!("Step '{}' cancelled on attempt {}", step.name, attempt);
                    return Err(StepError::Cancelled);
                }
                Err(e) => {
                    if attempt < attempts {
                        let delay = self.policy.next_delay();
                        warn!(
                            "Step '{}' failed (attempt {}/{}): {}, retrying in {:?}",
                            step.name, attempt, attempts, e, delay
                        );
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(StepError::Cancelled),
                            _ = sleep(delay) => {}
                        }
                    }
                    last_error = Some(e);
                }
            }
        }

        let source = last_error.unwrap_or_else(|| StepError::failed("step made no attempts"));
        error!("Step '{}' failed after {} attempts: {}", step.name, attempts, source);
        Err(StepError::Exhausted {
            step: step.name.clone(),
            attempts,
            source: Box::new(source),
        })
    }

    /// One attempt under its own child token.
    ///
    /// The child token is cancelled when the attempt ends, including on
    /// timeout, so work spawned by the body observes it independently of the
    /// outer token.
    async fn attempt(
        &self,
        step: &Step,
        input: StepInput,
        attempt: u32,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<StepOutput, StepError> {
        let attempt_token = cancel.child_token();
        let ctx = StepContext::new(step.name.clone(), attempt, attempt_token.clone());
        let body = step.run(ctx, input);

        let outcome = match timeout {
            Some(limit) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(StepError::Cancelled),
                res = tokio::time::timeout(limit, body) => match res {
                    Ok(res) => res,
                    Err(_) => Err(StepError::Timeout(limit)),
                },
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(StepError::Cancelled),
                res = body => res,
            },
        };

        attempt_token.cancel();
        outcome
    }
}
