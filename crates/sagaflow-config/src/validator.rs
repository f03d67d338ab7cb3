//! Configuration validation.

use std::path::Path;

use crate::error::ConfigError;
use crate::loader::ConfigLoader;
use crate::schema::{Config, StoreBackend};

const MAX_REASONABLE_RETRY_DELAY_MS: u64 = 60_000;
const KNOWN_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Warnings when valid, otherwise every error in one `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let problems = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid {
            count: self.errors.len(),
            problems,
        })
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_executor(config, &mut result);
        Self::validate_store(config, &mut result);
        Self::validate_checkpoint(config, &mut result);
        Self::validate_templates(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_executor(config: &Config, result: &mut ValidationResult) {
        if config.executor.retry_delay_ms > MAX_REASONABLE_RETRY_DELAY_MS {
            result.add_warning(ValidationWarning::new(
                "executor.retry_delay_ms",
                "retry delay is above 60s, failing steps will stall workflows for a long time",
            ));
        }

        if config.executor.default_step_timeout_secs == Some(0) {
            result.add_error(ValidationError::new(
                "executor.default_step_timeout_secs",
                "default_step_timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.backend == StoreBackend::Sqlite && config.store.path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "store.path",
                "SQLite backend requires a database path",
            ));
        }
    }

    fn validate_checkpoint(config: &Config, result: &mut ValidationResult) {
        if config.checkpoint.max_checkpoints == 0 {
            result.add_error(ValidationError::new(
                "checkpoint.max_checkpoints",
                "max_checkpoints must be greater than 0",
            ));
        }
    }

    fn validate_templates(config: &Config, result: &mut ValidationResult) {
        for file in &config.templates.files {
            let expanded = ConfigLoader::expand_path(file);
            if !Path::new(&expanded).exists() {
                result.add_warning(ValidationWarning::new(
                    "templates.files",
                    format!("Template file does not exist: {}", file),
                ));
            }
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_lowercase();
        if !KNOWN_LOG_LEVELS.contains(&level.as_str()) {
            result.add_warning(ValidationWarning::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, KNOWN_LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
