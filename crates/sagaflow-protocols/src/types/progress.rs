//! Progress and step bookkeeping records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Values, WorkflowStatus};
use crate::saga::CompensationDescriptor;

/// Progress of one workflow, upserted by workflow ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub workflow_id: String,
    pub current_step: usize,
    pub total_steps: usize,
    pub progress_percent: f64,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub current_step_name: String,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowProgress {
    /// Record reported for a workflow that has no progress yet.
    pub fn pending(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            current_step: 0,
            total_steps: 0,
            progress_percent: 0.0,
            status: WorkflowStatus::Pending,
            current_step_name: String::new(),
            updated_at: Utc::now(),
        }
    }

    /// Progress after `step` of `total` steps has finished.
    pub fn at_step(
        workflow_id: impl Into<String>,
        step: usize,
        total: usize,
        step_name: impl Into<String>,
        status: WorkflowStatus,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            current_step: step,
            total_steps: total,
            progress_percent: percent(step, total),
            status,
            current_step_name: step_name.into(),
            updated_at: Utc::now(),
        }
    }
}

/// `step / total * 100`, or 0 when there are no steps.
pub fn percent(step: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    step as f64 / total as f64 * 100.0
}

/// One entry of the step-performance log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub workflow_id: String,
    pub step_number: usize,
    pub step_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Values>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensation: Option<CompensationDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepRecord {
    /// An in-flight record for a step that just started.
    pub fn started(
        workflow_id: impl Into<String>,
        step_number: usize,
        step_name: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            step_number,
            step_name: step_name.into(),
            started_at: Utc::now(),
            ended_at: None,
            success: false,
            output: None,
            compensation: None,
            error: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.ended_at.is_some()
    }
}
