//! Agent errors.

use std::time::Duration;

use thiserror::Error;

use super::StepError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: StepError,
    },

    /// A saga step failed and every registered compensation ran cleanly.
    #[error("Step '{step}' failed ({attempted} compensations applied): {source}")]
    Compensated {
        step: String,
        attempted: usize,
        #[source]
        source: StepError,
    },

    /// A saga step failed and at least one compensation failed as well.
    #[error("Step '{step}' failed and compensation was incomplete ({}): {source}", .failures.join("; "))]
    CompensationFailed {
        step: String,
        failures: Vec<String>,
        #[source]
        source: StepError,
    },

    #[error("Invalid workflow: {0}")]
    InvalidWorkflow(String),

    #[error("Agent timed out after {0:?}")]
    Timeout(Duration),

    #[error("Scoring failed: {0}")]
    Scoring(String),
}

impl AgentError {
    /// Name of the step that failed, if the error came from a step.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step, .. }
            | Self::Compensated { step, .. }
            | Self::CompensationFailed { step, .. } => Some(step),
            _ => None,
        }
    }

    /// The step failure that caused this error.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::StepFailed { source, .. }
            | Self::Compensated { source, .. }
            | Self::CompensationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_error_step_failed() {
        let err = AgentError::StepFailed {
            step: "library_discovery".to_string(),
            source: StepError::failed("research query is required"),
        };
        assert!(err.to_string().contains("library_discovery"));
        assert!(err.to_string().contains("research query is required"));
        assert_eq!(err.failed_step(), Some("library_discovery"));
    }

    #[test]
    fn test_agent_error_compensation_failed_keeps_original_cause() {
        let err = AgentError::CompensationFailed {
            step: "run_tests".to_string(),
            failures: vec!["cleanup_workspace: disk busy".to_string()],
            source: StepError::failed("tests failed"),
        };
        let display = err.to_string();
        assert!(display.contains("tests failed"));
        assert!(display.contains("disk busy"));
        assert!(err.step_error().is_some());
    }

    #[test]
    fn test_agent_error_timeout() {
        let err = AgentError::Timeout(Duration::from_secs(30));
        assert!(err.to_string().contains("timed out"));
        assert!(err.failed_step().is_none());
    }

    #[test]
    fn test_agent_error_debug() {
        let err = AgentError::InvalidWorkflow("type mismatch".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("InvalidWorkflow"));
    }
}
