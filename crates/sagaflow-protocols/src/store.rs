//! Persistence protocol for workflow bookkeeping.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::saga::CompensationDescriptor;
use crate::types::{AgentResult, StepRecord, Values, Workflow, WorkflowProgress, WorkflowStatus};

/// Record store for workflows, progress, the step-performance log and results.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Insert a new workflow or replace an existing one with the same ID.
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), StoreError>;

    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError>;

    /// Update the lifecycle state; `error` is stored alongside failures.
    async fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Insert or overwrite the progress record of a workflow.
    async fn upsert_progress(&self, progress: &WorkflowProgress) -> Result<(), StoreError>;

    async fn get_progress(&self, workflow_id: &str) -> Result<Option<WorkflowProgress>, StoreError>;

    /// Append a step-performance entry.
    async fn record_step_start(&self, record: &StepRecord) -> Result<(), StoreError>;

    /// Complete the most recent entry of a step as successful.
    async fn record_step_success(
        &self,
        workflow_id: &str,
        step_number: usize,
        output: &Values,
        compensation: Option<&CompensationDescriptor>,
    ) -> Result<(), StoreError>;

    /// Complete the most recent entry of a step as failed.
    async fn record_step_failure(
        &self,
        workflow_id: &str,
        step_number: usize,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Step log of a workflow, ordered by step number then insertion.
    async fn step_records(&self, workflow_id: &str) -> Result<Vec<StepRecord>, StoreError>;

    async fn store_result(&self, result: &AgentResult) -> Result<(), StoreError>;

    async fn results(&self, workflow_id: &str) -> Result<Vec<AgentResult>, StoreError>;
}
