//! Recovery of interrupted runs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sagaflow_config::CheckpointConfig;
use sagaflow_protocols::{DurableEngine, WorkflowHandle};

use crate::checkpoint::{Checkpoint, CheckpointManager, CheckpointState};
use crate::error::CheckpointError;

/// Finds runs that started but never recorded an outcome and resumes them.
pub struct RecoveryManager {
    manager: Arc<CheckpointManager>,
    auto_recover: bool,
}

impl RecoveryManager {
    pub fn new(manager: Arc<CheckpointManager>, auto_recover: bool) -> Self {
        Self {
            manager,
            auto_recover,
        }
    }

    pub fn from_config(config: &CheckpointConfig, manager: Arc<CheckpointManager>) -> Self {
        Self::new(manager, config.auto_recover)
    }

    /// Latest checkpoint of `run_id`.
    pub async fn recover(&self, run_id: &str) -> Result<Checkpoint, CheckpointError> {
        self.manager
            .get_latest(run_id)
            .await?
            .ok_or_else(|| CheckpointError::NotFound(run_id.to_string()))
    }

    /// Latest checkpoints of every run that is still in the `Started` state.
    pub async fn interrupted_runs(&self) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut interrupted = Vec::new();
        for run_id in self.manager.list_runs().await? {
            if let Some(cp) = self.manager.get_latest(&run_id).await? {
                if cp.state == CheckpointState::Started {
                    interrupted.push(cp);
                }
            }
        }
        Ok(interrupted)
    }

    /// Re-execute every interrupted run on `engine` with its original input.
    ///
    /// Does nothing when auto recovery is disabled.
    pub async fn resume_interrupted(
        &self,
        engine: &dyn DurableEngine,
        cancel: &CancellationToken,
    ) -> Result<Vec<WorkflowHandle>, CheckpointError> {
        if !self.auto_recover {
            return Ok(Vec::new());
        }

        let mut handles = Vec::new();
        for cp in self.interrupted_runs().await? {
            info!(
                "Resuming run '{}' of '{}' from checkpoint {}",
                cp.run_id, cp.workflow_name, cp.sequence
            );
            let handle = engine
                .execute(&cp.workflow_name, &cp.run_id, cp.payload, cancel.child_token())
                .await
                .map_err(|e| {
                    warn!("Could not resume run '{}': {}", cp.run_id, e);
                    CheckpointError::RecoveryFailed(format!("{}: {}", cp.run_id, e))
                })?;
            handles.push(handle);
        }
        Ok(handles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CheckpointEngine;
    use crate::store::MemoryCheckpointStore;
    use futures::FutureExt;
    use sagaflow_protocols::DurableContext;
    use serde_json::{Value, json};

    fn manager() -> Arc<CheckpointManager> {
        Arc::new(CheckpointManager::new(10, Arc::new(MemoryCheckpointStore::new())))
    }

    async fn seed(manager: &CheckpointManager) {
        manager
            .record(&Checkpoint::started("done", "echo", 1, json!("a")))
            .await
            .unwrap();
        manager
            .record(&Checkpoint::completed("done", "echo", 2, json!("a")))
            .await
            .unwrap();
        manager
            .record(&Checkpoint::started("crashed", "echo", 1, json!("b")))
            .await
            .unwrap();
        manager
            .record(&Checkpoint::started("broken", "echo", 1, json!("c")))
            .await
            .unwrap();
        manager
            .record(&Checkpoint::failed("broken", "echo", 2, "boom"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_recover_missing_run() {
        let recovery = RecoveryManager::new(manager(), true);
        let err = recovery.recover("nonexistent").await.unwrap_err();
        assert!(matches!(err, CheckpointError::NotFound(id) if id == "nonexistent"));
    }

    #[tokio::test]
    async fn test_interrupted_runs_only_started() {
        let manager = manager();
        seed(&manager).await;
        let recovery = RecoveryManager::new(manager, true);

        let runs: Vec<_> = recovery
            .interrupted_runs()
            .await
            .unwrap()
            .into_iter()
            .map(|cp| cp.run_id)
            .collect();
        assert_eq!(runs, vec!["crashed"]);
    }

    #[tokio::test]
    async fn test_resume_interrupted_reruns_with_input() {
        let manager = manager();
        seed(&manager).await;
        let engine = CheckpointEngine::new(manager.clone());
        engine
            .register_workflow(
                "echo",
                Arc::new(|ctx: DurableContext| {
                    async move { Ok(json!({"input": ctx.input, "attempt": ctx.attempt})) }.boxed()
                }),
            )
            .unwrap();

        let recovery = RecoveryManager::new(manager.clone(), true);
        let handles = recovery
            .resume_interrupted(&engine, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(handles.len(), 1);

        let out: Value = handles.into_iter().next().unwrap().get().await.unwrap();
        assert_eq!(out["input"], "b");
        assert_eq!(out["attempt"], 2);
        assert!(manager.get_latest("crashed").await.unwrap().unwrap().is_completed());
    }

    #[tokio::test]
    async fn test_resume_disabled() {
        let manager = manager();
        seed(&manager).await;
        let engine = CheckpointEngine::new(manager.clone());

        let recovery = RecoveryManager::new(manager, false);
        let handles = recovery
            .resume_interrupted(&engine, &CancellationToken::new())
            .await
            .unwrap();
        assert!(handles.is_empty());
    }

    #[tokio::test]
    async fn test_resume_unregistered_fails() {
        let manager = manager();
        seed(&manager).await;
        let engine = CheckpointEngine::new(manager.clone());

        let recovery = RecoveryManager::new(manager, true);
        let err = recovery
            .resume_interrupted(&engine, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::RecoveryFailed(msg) if msg.contains("crashed")));
    }
}
