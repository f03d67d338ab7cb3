//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Create every table and index. Safe to run on an existing database.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS workflows (
    id TEXT PRIMARY KEY,
    workflow_type TEXT NOT NULL,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 2,
    agent_id TEXT NOT NULL,
    variables TEXT NOT NULL DEFAULT '{}',
    template_id TEXT,
    error TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One row per workflow, rewritten in place
CREATE TABLE IF NOT EXISTS workflow_progress (
    workflow_id TEXT PRIMARY KEY,
    current_step INTEGER NOT NULL,
    total_steps INTEGER NOT NULL,
    progress_percent REAL NOT NULL,
    status TEXT NOT NULL,
    current_step_name TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL
);

-- Append-only step log
CREATE TABLE IF NOT EXISTS step_performance (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    workflow_id TEXT NOT NULL,
    step_number INTEGER NOT NULL,
    step_name TEXT NOT NULL,
    started_at TEXT NOT NULL,
    ended_at TEXT,
    success INTEGER NOT NULL DEFAULT 0,
    output TEXT,
    compensation TEXT,
    error TEXT
);

CREATE TABLE IF NOT EXISTS workflow_results (
    id TEXT PRIMARY KEY,
    workflow_id TEXT NOT NULL,
    agent_type TEXT NOT NULL,
    result_kind TEXT NOT NULL,
    data TEXT NOT NULL,
    confidence_score REAL NOT NULL,
    quality_score REAL NOT NULL,
    execution_time_ms INTEGER NOT NULL,
    artifacts TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_workflows_status ON workflows(status);
CREATE INDEX IF NOT EXISTS idx_step_performance_workflow ON step_performance(workflow_id, step_number);
CREATE INDEX IF NOT EXISTS idx_workflow_results_workflow ON workflow_results(workflow_id);
"#;
