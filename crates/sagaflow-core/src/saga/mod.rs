//! Saga state and compensation draining.
//!
//! Each successful step may leave a [`CompensationDescriptor`] behind. The
//! descriptors form a stack owned by a single run; when a later step fails
//! the stack is drained newest-first through a [`CompensationRegistry`].
//! Draining is best-effort: a failing compensation is recorded and the
//! remaining ones still run.

mod registry;

pub use registry::{CompensationRegistry, FnCompensation};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use sagaflow_protocols::{
    CompensationDescriptor, CompensationFailure, CompensationReport, SagaView, StepOutput,
};

/// A compensation waiting on the stack, tagged with the step that pushed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCompensation {
    pub step: String,
    pub descriptor: CompensationDescriptor,
}

/// Per-run saga bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SagaState {
    workflow_id: String,
    steps_completed: Vec<String>,
    artifacts: Vec<String>,
    compensations: Vec<PendingCompensation>,
}

impl SagaState {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }

    /// Rebuild a saga from compensations recorded earlier, oldest first.
    pub fn from_pending(
        workflow_id: impl Into<String>,
        pending: impl IntoIterator<Item = (String, CompensationDescriptor)>,
    ) -> Self {
        let mut saga = Self::new(workflow_id);
        for (step, descriptor) in pending {
            saga.steps_completed.push(step.clone());
            saga.compensations.push(PendingCompensation { step, descriptor });
        }
        saga
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Record a successful step and its reserved saga entries.
    pub fn record_success(&mut self, step: &str, output: &StepOutput) {
        self.steps_completed.push(step.to_string());
        self.artifacts.extend(output.artifacts.iter().cloned());
        if let Some(descriptor) = &output.compensation {
            self.compensations.push(PendingCompensation {
                step: step.to_string(),
                descriptor: descriptor.clone(),
            });
        }
    }

    pub fn steps_completed(&self) -> &[String] {
        &self.steps_completed
    }

    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Number of compensations still on the stack.
    pub fn pending(&self) -> usize {
        self.compensations.len()
    }

    pub fn view(&self) -> SagaView {
        SagaView {
            steps_completed: self.steps_completed.clone(),
            artifacts: self.artifacts.clone(),
            pending_compensations: self.compensations.len(),
        }
    }

    pub fn into_artifacts(self) -> Vec<String> {
        self.artifacts
    }

    /// Pop and run every compensation, newest first.
    pub async fn compensate(&mut self, registry: &CompensationRegistry) -> CompensationReport {
        let mut report = CompensationReport::default();

        while let Some(pending) = self.compensations.pop() {
            let kind = pending.descriptor.kind.clone();
            info!(
                "Compensating step '{}' of workflow {} ({})",
                pending.step, self.workflow_id, kind
            );
            report.invoked.push(kind.clone());

            if let Err(e) = registry.dispatch(&pending.descriptor).await {
                warn!(
                    "Compensation '{}' for step '{}' of workflow {} failed: {}",
                    kind, pending.step, self.workflow_id, e
                );
                report.failures.push(CompensationFailure {
                    step: pending.step,
                    kind,
                    error: e.to_string(),
                });
            }
        }

        report
    }
}

#[cfg(test)]
#[path = "saga_tests.rs"]
mod tests;
