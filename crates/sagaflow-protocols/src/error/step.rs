//! Step errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("{0}")]
    Failed(String),

    #[error("Invalid step input: {0}")]
    InvalidInput(String),

    #[error("Step timed out after {0:?}")]
    Timeout(Duration),

    #[error("Step was cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// All attempts failed; `source` is the error of the last attempt.
    #[error("Step '{step}' failed after {attempts} attempts: {source}")]
    Exhausted {
        step: String,
        attempts: u32,
        #[source]
        source: Box<StepError>,
    },
}

impl StepError {
    /// Shorthand for a free-form step failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Whether this error, or the last attempt behind it, was a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Exhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_error_failed() {
        let err = StepError::failed("connection refused");
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_step_error_timeout() {
        let err = StepError::Timeout(Duration::from_secs(5));
        assert!(err.to_string().contains("timed out"));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_step_error_exhausted_mentions_step_and_attempts() {
        let err = StepError::Exhausted {
            step: "build_code".to_string(),
            attempts: 3,
            source: Box::new(StepError::failed("linker error")),
        };
        let display = err.to_string();
        assert!(display.contains("build_code"));
        assert!(display.contains("3 attempts"));
        assert!(display.contains("linker error"));
    }

    #[test]
    fn test_step_error_is_cancelled() {
        assert!(StepError::Cancelled.is_cancelled());
        assert!(!StepError::failed("x").is_cancelled());

        let wrapped = StepError::Exhausted {
            step: "s".to_string(),
            attempts: 1,
            source: Box::new(StepError::Cancelled),
        };
        assert!(wrapped.is_cancelled());
    }

    #[test]
    fn test_step_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = StepError::from(json_err);
        assert!(err.to_string().contains("Serialization error"));
    }
}
