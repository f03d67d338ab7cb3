//! Workflow records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Values;

/// Lifecycle state of a workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Failed,
    Paused,
    Cancelled,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further status transitions are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "paused" => Ok(Self::Paused),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown workflow status: {}", other)),
        }
    }
}

/// Request to start a new workflow, usually produced from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    pub title: String,
    pub workflow_type: String,
    pub agent_type: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub variables: Values,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

fn default_priority() -> i32 {
    2
}

/// A unit of work dispatched to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    /// Type tag selecting the agent family.
    pub workflow_type: String,
    pub title: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    #[serde(default = "default_priority")]
    pub priority: i32,
    /// Agent instance assigned to this workflow.
    pub agent_id: String,
    #[serde(default)]
    pub variables: Values,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Error message of the last failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create a pending workflow.
    pub fn new(
        id: impl Into<String>,
        workflow_type: impl Into<String>,
        agent_id: impl Into<String>,
        variables: Values,
    ) -> Self {
        let id = id.into();
        let now = Utc::now();
        Self {
            title: id.clone(),
            id,
            workflow_type: workflow_type.into(),
            status: WorkflowStatus::Pending,
            priority: default_priority(),
            agent_id: agent_id.into(),
            variables,
            template_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build a pending workflow from a start request with a fresh ID.
    pub fn from_request(request: StartWorkflowRequest) -> Self {
        let id = Uuid::new_v4().to_string();
        let agent_id = format!("{}-{}", request.agent_type, Uuid::new_v4());
        let now = Utc::now();
        Self {
            id,
            workflow_type: request.workflow_type,
            title: request.title,
            status: WorkflowStatus::Pending,
            priority: request.priority,
            agent_id,
            variables: request.variables,
            template_id: request.template_id,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            WorkflowStatus::Pending,
            WorkflowStatus::Active,
            WorkflowStatus::Completed,
            WorkflowStatus::Failed,
            WorkflowStatus::Paused,
            WorkflowStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<WorkflowStatus>().unwrap(), status);
        }
        assert!("running".parse::<WorkflowStatus>().is_err());
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        let json = serde_json::to_string(&WorkflowStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(WorkflowStatus::Completed.is_terminal());
        assert!(WorkflowStatus::Failed.is_terminal());
        assert!(!WorkflowStatus::Active.is_terminal());
        assert!(!WorkflowStatus::Paused.is_terminal());
    }

    #[test]
    fn test_from_request() {
        let mut variables = Values::new();
        variables.insert("query".to_string(), json!("async runtime"));
        let request = StartWorkflowRequest {
            title: "Basic Research".to_string(),
            workflow_type: "research".to_string(),
            agent_type: "research".to_string(),
            priority: 2,
            variables,
            template_id: Some("research-basic".to_string()),
        };

        let wf = Workflow::from_request(request);
        assert_eq!(wf.status, WorkflowStatus::Pending);
        assert_eq!(wf.workflow_type, "research");
        assert!(wf.agent_id.starts_with("research-"));
        assert_eq!(wf.template_id.as_deref(), Some("research-basic"));
        assert_eq!(wf.variables["query"], json!("async runtime"));
        assert!(!wf.id.is_empty());
    }

    #[test]
    fn test_request_defaults_priority() {
        let request: StartWorkflowRequest = serde_json::from_value(json!({
            "title": "t",
            "workflow_type": "poc",
            "agent_type": "poc"
        }))
        .unwrap();
        assert_eq!(request.priority, 2);
        assert!(request.variables.is_empty());
    }
}
