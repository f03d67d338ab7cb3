//! Checkpoint data structures and manager.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use sagaflow_config::CheckpointConfig;

use crate::error::CheckpointError;
use crate::store::CheckpointStore;

/// Where a run stood when the checkpoint was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointState {
    /// Execution began; `payload` is the input.
    Started,
    /// Execution finished; `payload` is the output.
    Completed,
    /// Execution returned an error; see `error`.
    Failed,
}

/// One checkpoint of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique checkpoint ID.
    pub id: Uuid,
    /// Run this checkpoint belongs to.
    pub run_id: String,
    /// Registered workflow function name.
    pub workflow_name: String,
    /// Position within the run, increasing.
    pub sequence: u32,
    pub state: CheckpointState,
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    fn new(
        run_id: impl Into<String>,
        workflow_name: impl Into<String>,
        sequence: u32,
        state: CheckpointState,
        payload: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            run_id: run_id.into(),
            workflow_name: workflow_name.into(),
            sequence,
            state,
            payload,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn started(
        run_id: impl Into<String>,
        workflow_name: impl Into<String>,
        sequence: u32,
        input: Value,
    ) -> Self {
        Self::new(run_id, workflow_name, sequence, CheckpointState::Started, input)
    }

    pub fn completed(
        run_id: impl Into<String>,
        workflow_name: impl Into<String>,
        sequence: u32,
        output: Value,
    ) -> Self {
        Self::new(run_id, workflow_name, sequence, CheckpointState::Completed, output)
    }

    pub fn failed(
        run_id: impl Into<String>,
        workflow_name: impl Into<String>,
        sequence: u32,
        error: impl Into<String>,
    ) -> Self {
        let mut checkpoint = Self::new(run_id, workflow_name, sequence, CheckpointState::Failed, Value::Null);
        checkpoint.error = Some(error.into());
        checkpoint
    }

    pub fn is_completed(&self) -> bool {
        self.state == CheckpointState::Completed
    }
}

/// Records checkpoints and keeps at most `max_checkpoints` per run.
pub struct CheckpointManager {
    max_checkpoints: usize,
    store: Arc<dyn CheckpointStore>,
}

impl CheckpointManager {
    /// Create a new checkpoint manager.
    pub fn new(max_checkpoints: usize, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            max_checkpoints: max_checkpoints.max(1),
            store,
        }
    }

    pub fn from_config(config: &CheckpointConfig, store: Arc<dyn CheckpointStore>) -> Self {
        Self::new(config.max_checkpoints, store)
    }

    /// Sequence number for the next checkpoint of `run_id`.
    pub async fn next_sequence(&self, run_id: &str) -> Result<u32, CheckpointError> {
        Ok(self
            .store
            .get_latest(run_id)
            .await?
            .map_or(1, |cp| cp.sequence.saturating_add(1)))
    }

    /// Save a checkpoint, then prune the run's oldest ones.
    pub async fn record(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        self.store.save(checkpoint).await?;
        self.cleanup(&checkpoint.run_id).await
    }

    /// Get the latest checkpoint for a run.
    pub async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        self.store.get_latest(run_id).await
    }

    /// Get a specific checkpoint by ID.
    pub async fn get(&self, id: &Uuid) -> Result<Option<Checkpoint>, CheckpointError> {
        self.store.get(id).await
    }

    /// List checkpoints for a run, oldest first.
    pub async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        self.store.list(run_id).await
    }

    /// IDs of every run with at least one checkpoint.
    pub async fn list_runs(&self) -> Result<Vec<String>, CheckpointError> {
        self.store.list_runs().await
    }

    /// Forget a run entirely.
    pub async fn delete_run(&self, run_id: &str) -> Result<(), CheckpointError> {
        self.store.delete_run(run_id).await
    }

    /// Cleanup old checkpoints, keeping only the most recent ones.
    async fn cleanup(&self, run_id: &str) -> Result<(), CheckpointError> {
        let checkpoints = self.store.list(run_id).await?;

        if checkpoints.len() > self.max_checkpoints {
            let to_delete = checkpoints.len() - self.max_checkpoints;
            debug!("Pruning {} checkpoints of run {}", to_delete, run_id);
            for checkpoint in checkpoints.iter().take(to_delete) {
                self.store.delete(&checkpoint.id).await?;
            }
        }

        Ok(())
    }
}
