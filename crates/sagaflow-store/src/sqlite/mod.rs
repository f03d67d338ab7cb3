//! SQLite workflow store.

mod rows;
mod schema;

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use tokio_rusqlite::Connection;
use tracing::debug;

use sagaflow_protocols::{
    AgentResult, CompensationDescriptor, StepRecord, StoreError, Values, Workflow, WorkflowProgress,
    WorkflowStatus, WorkflowStore,
};

use rows::{ProgressRow, ResultRow, StepRow, WorkflowRow};
use schema::init_schema;

fn db_error(e: tokio_rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Store backed by a SQLite database.
pub struct SqliteWorkflowStore {
    conn: Connection,
}

impl SqliteWorkflowStore {
    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Database(format!("{}: {}", parent.display(), e)))?;
        }
        debug!("Opening workflow database at {}", path.display());
        let conn = Connection::open(path).await.map_err(db_error)?;
        Self::init(conn).await
    }

    /// Create a new in-memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().await.map_err(db_error)?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| init_schema(conn)).await.map_err(db_error)?;
        Ok(Self { conn })
    }

    /// Complete the newest log entry of a step.
    async fn finish_step(
        &self,
        workflow_id: &str,
        step_number: usize,
        success: bool,
        output: Option<String>,
        compensation: Option<String>,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let wf = workflow_id.to_string();
        let ended_at = Utc::now().to_rfc3339();
        let step = step_number as i64;

        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE step_performance
                     SET ended_at = ?3, success = ?4, output = ?5, compensation = ?6, error = ?7
                     WHERE id = (SELECT MAX(id) FROM step_performance
                                 WHERE workflow_id = ?1 AND step_number = ?2)",
                    params![wf, step, ended_at, success, output, compensation, error],
                )?;
                Ok(n)
            })
            .await
            .map_err(db_error)?;

        if updated == 0 {
            return Err(StoreError::StepNotFound {
                workflow_id: workflow_id.to_string(),
                step_number,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for SqliteWorkflowStore {
    async fn create_workflow(&self, workflow: &Workflow) -> Result<(), StoreError> {
        debug!("Creating workflow {}", workflow.id);
        let w = workflow.clone();
        let variables = serde_json::to_string(&w.variables)?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO workflows (id, workflow_type, title, status, priority, agent_id,
                         variables, template_id, error, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        w.id,
                        w.workflow_type,
                        w.title,
                        w.status.as_str(),
                        w.priority,
                        w.agent_id,
                        variables,
                        w.template_id,
                        w.error,
                        w.created_at.to_rfc3339(),
                        w.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(db_error)
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM workflows WHERE id = ?1", WorkflowRow::COLUMNS);
                let row = conn
                    .query_row(&sql, [&id], WorkflowRow::from_row)
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(db_error)?;

        row.map(WorkflowRow::into_workflow).transpose()
    }

    async fn update_status(
        &self,
        id: &str,
        status: WorkflowStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        debug!("Workflow {} status -> {}", id, status);
        let wf = id.to_string();
        let error = error.map(str::to_string);
        let now = Utc::now().to_rfc3339();

        let updated = self
            .conn
            .call(move |conn| {
                let n = conn.execute(
                    "UPDATE workflows SET status = ?2, error = ?3, updated_at = ?4 WHERE id = ?1",
                    params![wf, status.as_str(), error, now],
                )?;
                Ok(n)
            })
            .await
            .map_err(db_error)?;

        if updated == 0 {
            return Err(StoreError::WorkflowNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn upsert_progress(&self, progress: &WorkflowProgress) -> Result<(), StoreError> {
        let p = progress.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_progress (workflow_id, current_step, total_steps,
                         progress_percent, status, current_step_name, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(workflow_id) DO UPDATE SET
                         current_step = excluded.current_step,
                         total_steps = excluded.total_steps,
                         progress_percent = excluded.progress_percent,
                         status = excluded.status,
                         current_step_name = excluded.current_step_name,
                         updated_at = excluded.updated_at",
                    params![
                        p.workflow_id,
                        p.current_step as i64,
                        p.total_steps as i64,
                        p.progress_percent,
                        p.status.as_str(),
                        p.current_step_name,
                        p.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(db_error)
    }

    async fn get_progress(&self, workflow_id: &str) -> Result<Option<WorkflowProgress>, StoreError> {
        let wf = workflow_id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT workflow_id, current_step, total_steps, progress_percent, status,
                             current_step_name, updated_at
                         FROM workflow_progress WHERE workflow_id = ?1",
                        [&wf],
                        ProgressRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(db_error)?;

        row.map(ProgressRow::into_progress).transpose()
    }

    async fn record_step_start(&self, record: &StepRecord) -> Result<(), StoreError> {
        debug!(
            "Workflow {} step {} '{}' started",
            record.workflow_id, record.step_number, record.step_name
        );
        let r = record.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO step_performance (workflow_id, step_number, step_name, started_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![r.workflow_id, r.step_number as i64, r.step_name, r.started_at.to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(db_error)
    }

    async fn record_step_success(
        &self,
        workflow_id: &str,
        step_number: usize,
        output: &Values,
        compensation: Option<&CompensationDescriptor>,
    ) -> Result<(), StoreError> {
        let output = serde_json::to_string(output)?;
        let compensation = compensation.map(serde_json::to_string).transpose()?;
        self.finish_step(workflow_id, step_number, true, Some(output), compensation, None)
            .await
    }

    async fn record_step_failure(
        &self,
        workflow_id: &str,
        step_number: usize,
        error: &str,
    ) -> Result<(), StoreError> {
        self.finish_step(workflow_id, step_number, false, None, None, Some(error.to_string()))
            .await
    }

    async fn step_records(&self, workflow_id: &str) -> Result<Vec<StepRecord>, StoreError> {
        let wf = workflow_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT workflow_id, step_number, step_name, started_at, ended_at, success,
                         output, compensation, error
                     FROM step_performance WHERE workflow_id = ?1
                     ORDER BY step_number, id",
                )?;
                let rows = stmt
                    .query_map([&wf], StepRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(db_error)?;

        rows.into_iter().map(StepRow::into_record).collect()
    }

    async fn store_result(&self, result: &AgentResult) -> Result<(), StoreError> {
        debug!("Storing result {} for workflow {}", result.id, result.workflow_id);
        let r = result.clone();
        let data = serde_json::to_string(&r.data)?;
        let artifacts = serde_json::to_string(&r.artifacts)?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO workflow_results (id, workflow_id, agent_type, result_kind, data,
                         confidence_score, quality_score, execution_time_ms, artifacts, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        r.id,
                        r.workflow_id,
                        r.agent_type,
                        r.result_kind.as_str(),
                        data,
                        r.scores.confidence(),
                        r.scores.quality(),
                        i64::try_from(r.execution_time_ms).unwrap_or(i64::MAX),
                        artifacts,
                        r.created_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(db_error)
    }

    async fn results(&self, workflow_id: &str) -> Result<Vec<AgentResult>, StoreError> {
        let wf = workflow_id.to_string();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, workflow_id, agent_type, result_kind, data, confidence_score,
                         quality_score, execution_time_ms, artifacts, created_at
                     FROM workflow_results WHERE workflow_id = ?1
                     ORDER BY created_at, rowid",
                )?;
                let rows = stmt
                    .query_map([&wf], ResultRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(db_error)?;

        rows.into_iter().map(ResultRow::into_result).collect()
    }
}
