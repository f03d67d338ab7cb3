//! Saga compensation protocol.
//!
//! A step that provisions something external describes how to undo it with a
//! [`CompensationDescriptor`]. Descriptors are plain data, so they can be
//! persisted with the step log and replayed after a restart; at drain time
//! each descriptor is dispatched to the [`CompensationHandler`] registered
//! for its `kind`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CompensationError;
use crate::types::Values;

/// Serializable description of one compensating action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationDescriptor {
    pub kind: String,
    #[serde(default)]
    pub params: Values,
}

impl CompensationDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: Values::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// String parameter, or `InvalidParams` if it is missing.
    pub fn str_param(&self, key: &str) -> Result<&str, CompensationError> {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CompensationError::InvalidParams(format!("{} requires string param '{}'", self.kind, key))
            })
    }
}

/// Interprets descriptors of one kind.
#[async_trait]
pub trait CompensationHandler: Send + Sync {
    /// Descriptor kind this handler understands.
    fn kind(&self) -> &str;

    async fn compensate(&self, descriptor: &CompensationDescriptor) -> Result<(), CompensationError>;
}

/// A compensation that did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationFailure {
    pub step: String,
    pub kind: String,
    pub error: String,
}

impl std::fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.step, self.error)
    }
}

/// Outcome of draining a compensation stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompensationReport {
    /// Compensations invoked, in invocation order.
    pub invoked: Vec<String>,
    pub failures: Vec<CompensationFailure>,
}

impl CompensationReport {
    pub fn attempted(&self) -> usize {
        self.invoked.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Read-only view of saga state handed to steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SagaView {
    pub steps_completed: Vec<String>,
    pub artifacts: Vec<String>,
    pub pending_compensations: usize,
}
