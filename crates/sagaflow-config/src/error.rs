//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Validation found `count` errors.
    #[error("Invalid configuration ({count} errors): {problems}")]
    Invalid { count: usize, problems: String },

    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_var_names_variable() {
        let err = ConfigError::EnvVarNotSet("SAGAFLOW_DB".to_string());
        assert_eq!(err.to_string(), "Environment variable not set: SAGAFLOW_DB");
    }

    #[test]
    fn test_invalid_lists_problems() {
        let err = ConfigError::Invalid {
            count: 2,
            problems: "checkpoint.max_checkpoints: must be positive; store.path: empty".to_string(),
        };
        let display = err.to_string();
        assert!(display.starts_with("Invalid configuration (2 errors)"));
        assert!(display.contains("store.path: empty"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::from(io_err);
        assert_eq!(err.to_string(), "Failed to read config: denied");
    }
}
