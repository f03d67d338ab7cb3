//! In-memory workflow store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use sagaflow_protocols::{
    AgentResult, CompensationDescriptor, StepRecord, StoreError, Values, Workflow, WorkflowProgress,
    WorkflowStatus, WorkflowStore,
};

/// Store backed by process-local maps. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    workflows: RwLock<HashMap<String, Workflow>>,
    progress: RwLock<HashMap<String, WorkflowProgress>>,
    steps: RwLock<HashMap<String, Vec<StepRecord>>>,
    results: RwLock<HashMap<String, Vec<AgentResult>>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `finish` to the newest record of `step_number`.
    async fn finish_step(
        &self,
        workflow_id: &str,
        step_number: usize,
        finish: impl FnOnce(&mut StepRecord),
    ) -> Result<(), StoreError> {
        let mut steps = self.steps.write().await;
        let record = steps
            .get_mut(workflow_id)
            .and_then(|records| records.iter_mut().rev().find(|r| r.step_number == step_number))
            .ok_or_else(|| StoreError::StepNotFound {
                workflow_id: workflow_id.to_string(),
                step_number,
            })?;
        record.ended_at = Some(Utc::now());
        finish(record);
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        debug!("Creating workflow {}", workflow.id);
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.read().await.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(id)
            .ok_or_else(|| StoreError::WorkflowNotFound(id.to_string()))?;
        debug!("Workflow {} status {} -> {}", id, workflow.status, status);
        workflow.status = status;
        workflow.error = error.map(str::to_string);
        workflow.updated_at = Utc::now();
        Ok(())
    }

    async fn upsert_progress(&self, progress: &WorkflowProgress) -> Result<(), StoreError> {
        self.progress
            .write()
            .await
            .insert(progress.workflow_id.clone(), progress.clone());
        Ok(())
    }

    async fn get_progress(&self, workflow_id: &str) -> Result<Option<WorkflowProgress>, StoreError> {
        Ok(self.progress.read().await.get(workflow_id).cloned())
    }

    async fn record_step_start(&self, record: &StepRecord) -> Result<(), StoreError> {
        debug!(
            "Workflow {} step {} '{}' started",
            record.workflow_id, record.step_number, record.step_name
        );
        self.steps
            .write()
            .await
            .entry(record.workflow_id.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn record_step_success(
        &self,
        workflow_id: &str,
        step_number: usize,
        output: &Values,
        compensation: Option<&CompensationDescriptor>,
    ) -> Result<(), StoreError> {
        self.finish_step(workflow_id, step_number, |record| {
            record.success = true;
            record.output = Some(output.clone());
            record.compensation = compensation.cloned();
            record.error = None;
        })
        .await
    }

    async fn record_step_failure(
        &self,
        workflow_id: &str,
        step_number: usize,
        error: &str,
    ) -> Result<(), StoreError> {
        self.finish_step(workflow_id, step_number, |record| {
            record.success = false;
            record.error = Some(error.to_string());
        })
        .await
    }

    async fn step_records(&self, workflow_id: &str) -> Result<Vec<StepRecord>, StoreError> {
        let mut records = self
            .steps
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .unwrap_or_default();
        // Stable sort keeps insertion order within a step.
        records.sort_by_key(|r| r.step_number);
        Ok(records)
    }

    async fn store_result(&self, result: &AgentResult) -> Result<(), StoreError> {
        debug!("Storing result {} for workflow {}", result.id, result.workflow_id);
        self.results
            .write()
            .await
            .entry(result.workflow_id.clone())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    async fn results(&self, workflow_id: &str) -> Result<Vec<AgentResult>, StoreError> {
        Ok(self
            .results
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance;

    #[tokio::test]
    async fn test_workflow_lifecycle() {
        conformance::workflow_lifecycle(&MemoryWorkflowStore::new()).await;
    }

    #[tokio::test]
    async fn test_progress_upsert() {
        conformance::progress_upsert(&MemoryWorkflowStore::new()).await;
    }

    #[tokio::test]
    async fn test_step_log() {
        conformance::step_log(&MemoryWorkflowStore::new()).await;
    }

    #[tokio::test]
    async fn test_results() {
        conformance::results(&MemoryWorkflowStore::new()).await;
    }
}
