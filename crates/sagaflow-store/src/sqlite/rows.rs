//! Raw table rows and their conversion into protocol types.
//!
//! Rows hold plain column values so they can leave the connection thread;
//! JSON and timestamp parsing happens afterwards.

use chrono::{DateTime, Utc};
use rusqlite::Row;

use sagaflow_protocols::{
    AgentResult, CompensationDescriptor, ResultKind, Scores, StepRecord, StoreError, Values,
    Workflow, WorkflowProgress, WorkflowStatus,
};

pub(super) fn parse_time(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Database(format!("invalid timestamp '{}': {}", value, e)))
}

fn parse_status(value: &str) -> Result<WorkflowStatus, StoreError> {
    value.parse().map_err(StoreError::Database)
}

fn to_usize(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

pub(super) struct WorkflowRow {
    id: String,
    workflow_type: String,
    title: String,
    status: String,
    priority: i32,
    agent_id: String,
    variables: String,
    template_id: Option<String>,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl WorkflowRow {
    pub(super) const COLUMNS: &'static str = "id, workflow_type, title, status, priority, agent_id, \
         variables, template_id, error, created_at, updated_at";

    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workflow_type: row.get(1)?,
            title: row.get(2)?,
            status: row.get(3)?,
            priority: row.get(4)?,
            agent_id: row.get(5)?,
            variables: row.get(6)?,
            template_id: row.get(7)?,
            error: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub(super) fn into_workflow(self) -> Result<Workflow, StoreError> {
        Ok(Workflow {
            id: self.id,
            workflow_type: self.workflow_type,
            title: self.title,
            status: parse_status(&self.status)?,
            priority: self.priority,
            agent_id: self.agent_id,
            variables: serde_json::from_str(&self.variables)?,
            template_id: self.template_id,
            error: self.error,
            created_at: parse_time(&self.created_at)?,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

pub(super) struct ProgressRow {
    workflow_id: String,
    current_step: i64,
    total_steps: i64,
    progress_percent: f64,
    status: String,
    current_step_name: String,
    updated_at: String,
}

impl ProgressRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            workflow_id: row.get(0)?,
            current_step: row.get(1)?,
            total_steps: row.get(2)?,
            progress_percent: row.get(3)?,
            status: row.get(4)?,
            current_step_name: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    pub(super) fn into_progress(self) -> Result<WorkflowProgress, StoreError> {
        Ok(WorkflowProgress {
            workflow_id: self.workflow_id,
            current_step: to_usize(self.current_step),
            total_steps: to_usize(self.total_steps),
            progress_percent: self.progress_percent,
            status: parse_status(&self.status)?,
            current_step_name: self.current_step_name,
            updated_at: parse_time(&self.updated_at)?,
        })
    }
}

pub(super) struct StepRow {
    workflow_id: String,
    step_number: i64,
    step_name: String,
    started_at: String,
    ended_at: Option<String>,
    success: bool,
    output: Option<String>,
    compensation: Option<String>,
    error: Option<String>,
}

impl StepRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            workflow_id: row.get(0)?,
            step_number: row.get(1)?,
            step_name: row.get(2)?,
            started_at: row.get(3)?,
            ended_at: row.get(4)?,
            success: row.get(5)?,
            output: row.get(6)?,
            compensation: row.get(7)?,
            error: row.get(8)?,
        })
    }

    pub(super) fn into_record(self) -> Result<StepRecord, StoreError> {
        let output: Option<Values> = self.output.as_deref().map(serde_json::from_str).transpose()?;
        let compensation: Option<CompensationDescriptor> = self
            .compensation
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(StepRecord {
            workflow_id: self.workflow_id,
            step_number: to_usize(self.step_number),
            step_name: self.step_name,
            started_at: parse_time(&self.started_at)?,
            ended_at: self.ended_at.as_deref().map(parse_time).transpose()?,
            success: self.success,
            output,
            compensation,
            error: self.error,
        })
    }
}

pub(super) struct ResultRow {
    id: String,
    workflow_id: String,
    agent_type: String,
    result_kind: String,
    data: String,
    confidence_score: f64,
    quality_score: f64,
    execution_time_ms: i64,
    artifacts: String,
    created_at: String,
}

impl ResultRow {
    pub(super) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            agent_type: row.get(2)?,
            result_kind: row.get(3)?,
            data: row.get(4)?,
            confidence_score: row.get(5)?,
            quality_score: row.get(6)?,
            execution_time_ms: row.get(7)?,
            artifacts: row.get(8)?,
            created_at: row.get(9)?,
        })
    }

    pub(super) fn into_result(self) -> Result<AgentResult, StoreError> {
        let result_kind: ResultKind = self.result_kind.parse().map_err(StoreError::Database)?;
        Ok(AgentResult {
            id: self.id,
            workflow_id: self.workflow_id,
            agent_type: self.agent_type,
            result_kind,
            data: serde_json::from_str(&self.data)?,
            scores: Scores::new(self.confidence_score, self.quality_score),
            execution_time_ms: u64::try_from(self.execution_time_ms).unwrap_or(0),
            artifacts: serde_json::from_str(&self.artifacts)?,
            created_at: parse_time(&self.created_at)?,
        })
    }
}
