//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_infra;

pub use schema_infra::*;

/// Shared default helper used by submodules.
pub(crate) fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the workflow executor runs agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Run agents in-process.
    #[default]
    Direct,
    /// Delegate runs to the checkpointing engine.
    Durable,
}

/// Workflow executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Delay between failed step attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Add random jitter (up to 25%) to the retry delay.
    #[serde(default)]
    pub retry_jitter: bool,

    /// Timeout for steps that declare none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_step_timeout_secs: Option<u64>,
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_jitter: false,
            default_step_timeout_secs: None,
        }
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
