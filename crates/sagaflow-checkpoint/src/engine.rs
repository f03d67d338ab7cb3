//! Checkpointing implementation of [`DurableEngine`].

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sagaflow_protocols::{DurableContext, DurableEngine, EngineError, WorkflowFn, WorkflowHandle};

use crate::checkpoint::{Checkpoint, CheckpointManager, CheckpointState};

/// Runs registered workflow functions and checkpoints each run's input and outcome.
///
/// A run whose latest checkpoint is `Completed` is not executed again; its
/// stored output is returned instead.
pub struct CheckpointEngine {
    manager: Arc<CheckpointManager>,
    workflows: DashMap<String, WorkflowFn>,
}

impl CheckpointEngine {
    pub fn new(manager: Arc<CheckpointManager>) -> Self {
        Self {
            manager,
            workflows: DashMap::new(),
        }
    }

    pub fn manager(&self) -> &Arc<CheckpointManager> {
        &self.manager
    }

    /// Names of the registered workflow functions, sorted.
    pub fn workflow_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.workflows.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DurableEngine for CheckpointEngine {
    fn register_workflow(&self, name: &str, func: WorkflowFn) -> Result<(), EngineError> {
        if self.workflows.insert(name.to_string(), func).is_some() {
            debug!("Replaced workflow function '{}'", name);
        } else {
            debug!("Registered workflow function '{}'", name);
        }
        Ok(())
    }

    async fn execute(
        &self,
        name: &str,
        run_id: &str,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<WorkflowHandle, EngineError> {
        let func = self
            .workflows
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::NotRegistered(name.to_string()))?;

        let history = self.manager.list(run_id).await?;
        if let Some(latest) = history.last().filter(|cp| cp.is_completed()) {
            info!("Run '{}' already completed, returning stored output", run_id);
            return Ok(WorkflowHandle::ready(run_id, Ok(latest.payload.clone())));
        }

        let attempt = 1 + history
            .iter()
            .filter(|cp| cp.state == CheckpointState::Started)
            .count() as u32;
        let sequence = history.last().map_or(1, |cp| cp.sequence.saturating_add(1));

        self.manager
            .record(&Checkpoint::started(run_id, name, sequence, input.clone()))
            .await?;
        info!("Starting run '{}' of '{}' (attempt {})", run_id, name, attempt);

        let ctx = DurableContext {
            run_id: run_id.to_string(),
            input,
            attempt,
            cancel: cancel.clone(),
        };
        let manager = Arc::clone(&self.manager);
        let name = name.to_string();
        let run = run_id.to_string();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = func(ctx).await;
            let next = sequence.saturating_add(1);

            let recorded = match &outcome {
                Ok(output) => {
                    manager
                        .record(&Checkpoint::completed(&run, &name, next, output.clone()))
                        .await
                }
                Err(e) if cancel.is_cancelled() && !e.is_final() => {
                    info!("Run '{}' cancelled, leaving it resumable: {}", run, e);
                    Ok(())
                }
                Err(e) => {
                    manager
                        .record(&Checkpoint::failed(&run, &name, next, e.to_string()))
                        .await
                }
            };

            let outcome = match recorded {
                Ok(()) => outcome,
                Err(e) => {
                    warn!("Failed to checkpoint outcome of run '{}': {}", run, e);
                    outcome.and(Err(e.into()))
                }
            };

            if tx.send(outcome).is_err() {
                debug!("Handle of run '{}' dropped before completion", run);
            }
        });

        Ok(WorkflowHandle::new(run_id, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCheckpointStore;
    use futures::FutureExt;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn engine() -> CheckpointEngine {
        CheckpointEngine::new(Arc::new(CheckpointManager::new(
            10,
            Arc::new(MemoryCheckpointStore::new()),
        )))
    }

    fn counting_fn(calls: Arc<AtomicU32>) -> WorkflowFn {
        Arc::new(move |ctx: DurableContext| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"echo": ctx.input, "attempt": ctx.attempt}))
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_execute_records_and_returns_output() {
        let engine = engine();
        let calls = Arc::new(AtomicU32::new(0));
        engine.register_workflow("echo", counting_fn(calls.clone())).unwrap();

        let handle = engine
            .execute("echo", "run-1", json!("hi"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handle.run_id(), "run-1");
        let out: Value = handle.get().await.unwrap();
        assert_eq!(out["echo"], "hi");
        assert_eq!(out["attempt"], 1);

        let states: Vec<_> = engine
            .manager()
            .list("run-1")
            .await
            .unwrap()
            .into_iter()
            .map(|cp| cp.state)
            .collect();
        assert_eq!(states, vec![CheckpointState::Started, CheckpointState::Completed]);
    }

    #[tokio::test]
    async fn test_completed_run_is_not_executed_again() {
        let engine = engine();
        let calls = Arc::new(AtomicU32::new(0));
        engine.register_workflow("echo", counting_fn(calls.clone())).unwrap();

        for _ in 0..2 {
            let out: Value = engine
                .execute("echo", "run-1", json!("hi"), CancellationToken::new())
                .await
                .unwrap()
                .get()
                .await
                .unwrap();
            assert_eq!(out["echo"], "hi");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_workflow() {
        let err = engine()
            .execute("missing", "run-1", Value::Null, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotRegistered(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_failure_is_checkpointed_and_retried_with_next_attempt() {
        let engine = engine();
        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();
        engine
            .register_workflow(
                "flaky",
                Arc::new(move |ctx: DurableContext| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.store(ctx.attempt, Ordering::SeqCst);
                        if ctx.attempt == 1 {
                            Err(EngineError::WorkflowFailed("first try".to_string()))
                        } else {
                            Ok(json!("ok"))
                        }
                    }
                    .boxed()
                }),
            )
            .unwrap();

        let err = engine
            .execute("flaky", "run-1", Value::Null, CancellationToken::new())
            .await
            .unwrap()
            .get::<Value>()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("first try"));
        let latest = engine.manager().get_latest("run-1").await.unwrap().unwrap();
        assert_eq!(latest.state, CheckpointState::Failed);

        let out: String = engine
            .execute("flaky", "run-1", Value::Null, CancellationToken::new())
            .await
            .unwrap()
            .get()
            .await
            .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_stays_resumable() {
        let engine = engine();
        engine
            .register_workflow(
                "cancellable",
                Arc::new(|ctx: DurableContext| {
                    async move {
                        ctx.cancel.cancelled().await;
                        Err(EngineError::WorkflowFailed("cancelled".to_string()))
                    }
                    .boxed()
                }),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = engine
            .execute("cancellable", "run-1", Value::Null, cancel.clone())
            .await
            .unwrap();
        cancel.cancel();
        assert!(handle.get::<Value>().await.is_err());

        let latest = engine.manager().get_latest("run-1").await.unwrap().unwrap();
        assert_eq!(latest.state, CheckpointState::Started);
    }

    #[tokio::test]
    async fn test_cancelled_rollback_is_recorded_failed() {
        let engine = engine();
        engine
            .register_workflow(
                "rollback",
                Arc::new(|ctx: DurableContext| {
                    async move {
                        ctx.cancel.cancelled().await;
                        Err(EngineError::RolledBack("step 'b' cancelled".to_string()))
                    }
                    .boxed()
                }),
            )
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = engine
            .execute("rollback", "run-1", Value::Null, cancel.clone())
            .await
            .unwrap();
        cancel.cancel();
        let err = handle.get::<Value>().await.unwrap_err();
        assert!(err.to_string().contains("rolled back"));

        let latest = engine.manager().get_latest("run-1").await.unwrap().unwrap();
        assert_eq!(latest.state, CheckpointState::Failed);
    }

    #[test]
    fn test_register_replaces() {
        let engine = engine();
        let calls = Arc::new(AtomicU32::new(0));
        engine.register_workflow("b", counting_fn(calls.clone())).unwrap();
        engine.register_workflow("a", counting_fn(calls.clone())).unwrap();
        engine.register_workflow("a", counting_fn(calls)).unwrap();
        assert_eq!(engine.workflow_names(), vec!["a", "b"]);
    }
}
