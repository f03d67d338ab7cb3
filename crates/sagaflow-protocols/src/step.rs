//! Step protocol definitions.
//!
//! A step is the smallest retryable, timeout-bounded unit of agent work.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::StepError;
use crate::saga::{CompensationDescriptor, SagaView};
use crate::types::Values;

/// Body of a step.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn run(&self, ctx: StepContext, input: StepInput) -> Result<StepOutput, StepError>;
}

/// Adapter turning an async closure into a [`StepHandler`].
pub struct FnStep<F>(F);

#[async_trait]
impl<F, Fut> StepHandler for FnStep<F>
where
    F: Fn(StepContext, StepInput) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepOutput, StepError>> + Send,
{
    async fn run(&self, ctx: StepContext, input: StepInput) -> Result<StepOutput, StepError> {
        (self.0)(ctx, input).await
    }
}

/// Per-attempt context passed to a step body.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Cancelled when the attempt times out or the run is cancelled.
    pub cancel: CancellationToken,
    /// 1-based attempt number.
    pub attempt: u32,
    pub step_name: String,
}

impl StepContext {
    pub fn new(step_name: impl Into<String>, attempt: u32, cancel: CancellationToken) -> Self {
        Self {
            cancel,
            attempt,
            step_name: step_name.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// A named unit of work with a retry budget and an optional timeout.
#[derive(Clone)]
pub struct Step {
    pub name: String,
    pub description: String,
    /// Bound on a single attempt. `None` runs until the body returns or the
    /// run is cancelled.
    pub timeout: Option<Duration>,
    /// Additional attempts after the first.
    pub retry_count: u32,
    handler: Arc<dyn StepHandler>,
}

impl Step {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl StepHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            timeout: None,
            retry_count: 0,
            handler: Arc::new(handler),
        }
    }

    /// Build a step from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(StepContext, StepInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutput, StepError>> + Send + 'static,
    {
        Self::new(name, description, FnStep(f))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Total attempts allowed: `retry_count + 1`.
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Invoke the body once.
    pub async fn run(&self, ctx: StepContext, input: StepInput) -> Result<StepOutput, StepError> {
        self.handler.run(ctx, input).await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("retry_count", &self.retry_count)
            .finish_non_exhaustive()
    }
}

/// Input handed to each step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    pub workflow_id: String,
    /// 1-based index of the step.
    pub step_number: usize,
    pub total_steps: usize,
    #[serde(default)]
    pub variables: Values,
    /// Merged outputs of every earlier step of the run.
    #[serde(default)]
    pub results: Values,
    #[serde(rename = "saga_state", default, skip_serializing_if = "Option::is_none")]
    pub saga: Option<SagaView>,
}

impl StepInput {
    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn variable_str(&self, key: &str) -> Option<&str> {
        self.variables.get(key).and_then(Value::as_str)
    }

    /// String variable that must be present and non-empty.
    pub fn require_str(&self, key: &str, message: &str) -> Result<&str, StepError> {
        match self.variable_str(key) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(StepError::InvalidInput(message.to_string())),
        }
    }

    pub fn result(&self, key: &str) -> Option<&Value> {
        self.results.get(key)
    }

    /// Deserialize an earlier step's output entry.
    pub fn result_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<T, StepError> {
        let value = self
            .results
            .get(key)
            .ok_or_else(|| StepError::InvalidInput(format!("missing result '{}'", key)))?;
        Ok(serde_json::from_value(value.clone())?)
    }
}

/// Output of a successful step.
///
/// `compensation` and `artifacts` are the reserved saga entries; in JSON form
/// they sit next to the ordinary values under the keys `compensation` and
/// `artifacts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    #[serde(flatten)]
    pub values: Values,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<CompensationDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Insert any serializable value.
    pub fn with_json<T: Serialize>(mut self, key: impl Into<String>, value: &T) -> Result<Self, StepError> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn with_compensation(mut self, compensation: CompensationDescriptor) -> Self {
        self.compensation = Some(compensation);
        self
    }

    pub fn with_artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.artifacts.extend(artifacts.into_iter().map(Into::into));
        self
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
