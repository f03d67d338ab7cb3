//! Infrastructure configuration types (store, checkpoint, templates, logging).

use serde::{Deserialize, Serialize};

use super::default_true;

/// Backend of the workflow store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Workflow store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite database path (supports `~`).
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_path() -> String {
    "~/.sagaflow/sagaflow.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

/// Backend of the checkpoint store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    Memory,
    #[default]
    File,
}

/// Checkpoint configuration for durable execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,

    /// Storage path for checkpoint files.
    #[serde(default = "default_checkpoint_path")]
    pub storage_path: String,

    /// Checkpoints kept per run.
    #[serde(default = "default_max_checkpoints")]
    pub max_checkpoints: usize,

    /// Resume interrupted runs on startup.
    #[serde(default = "default_true")]
    pub auto_recover: bool,
}

fn default_checkpoint_path() -> String {
    "~/.sagaflow/checkpoints".to_string()
}

fn default_max_checkpoints() -> usize {
    10
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            storage_path: default_checkpoint_path(),
            max_checkpoints: default_max_checkpoints(),
            auto_recover: default_true(),
        }
    }
}

/// Template catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Register the built-in templates.
    #[serde(default = "default_true")]
    pub builtin: bool,

    /// Extra JSON template files registered at startup.
    #[serde(default)]
    pub files: Vec<String>,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            builtin: default_true(),
            files: Vec::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write daily-rolling log files.
    #[serde(default)]
    pub file: bool,

    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "~/.sagaflow/logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
            dir: default_log_dir(),
        }
    }
}
