//! Durable execution engine protocol.
//!
//! A durable engine runs registered workflow functions under a run ID and
//! checkpoints their outcome, so a run that already finished is not executed
//! again when it is resumed after a restart.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;

/// Context handed to a workflow function.
#[derive(Debug, Clone)]
pub struct DurableContext {
    pub run_id: String,
    /// Input the run was started with.
    pub input: Value,
    /// 1-based execution attempt of this run ID.
    pub attempt: u32,
    pub cancel: CancellationToken,
}

/// A checkpointable workflow function.
pub type WorkflowFn =
    Arc<dyn Fn(DurableContext) -> BoxFuture<'static, Result<Value, EngineError>> + Send + Sync>;

/// Handle of a started run.
#[derive(Debug)]
pub struct WorkflowHandle {
    run_id: String,
    outcome: oneshot::Receiver<Result<Value, EngineError>>,
}

impl WorkflowHandle {
    pub fn new(run_id: impl Into<String>, outcome: oneshot::Receiver<Result<Value, EngineError>>) -> Self {
        Self {
            run_id: run_id.into(),
            outcome,
        }
    }

    /// A handle whose outcome is already known.
    pub fn ready(run_id: impl Into<String>, outcome: Result<Value, EngineError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self::new(run_id, rx)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Wait for the run to finish and decode its output.
    pub async fn get<T: DeserializeOwned>(self) -> Result<T, EngineError> {
        let value = self
            .outcome
            .await
            .map_err(|_| EngineError::Interrupted(self.run_id.clone()))??;
        Ok(serde_json::from_value(value)?)
    }
}

/// Engine able to checkpoint and resume workflow runs.
#[async_trait]
pub trait DurableEngine: Send + Sync {
    /// Register a workflow function under a name; replaces any previous one.
    fn register_workflow(&self, name: &str, func: WorkflowFn) -> Result<(), EngineError>;

    /// Start (or resume) the run `run_id` of workflow `name`.
    async fn execute(
        &self,
        name: &str,
        run_id: &str,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<WorkflowHandle, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_ready_handle_decodes_output() {
        let handle = WorkflowHandle::ready("run-1", Ok(json!({"answer": 42})));
        assert_eq!(handle.run_id(), "run-1");
        let out: serde_json::Map<String, Value> = handle.get().await.unwrap();
        assert_eq!(out["answer"], 42);
    }

    #[tokio::test]
    async fn test_ready_handle_propagates_failure() {
        let handle = WorkflowHandle::ready("run-1", Err(EngineError::WorkflowFailed("boom".to_string())));
        let err = handle.get::<Value>().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_dropped_sender_is_interrupted() {
        let (tx, rx) = oneshot::channel();
        drop(tx);
        let handle = WorkflowHandle::new("run-9", rx);
        let err = handle.get::<Value>().await.unwrap_err();
        assert!(matches!(err, EngineError::Interrupted(id) if id == "run-9"));
    }
}
