use super::*;
use std::sync::Arc;

use parking_lot::Mutex;
use sagaflow_protocols::CompensationError;

/// Registry whose handler records the `id` param of every descriptor it sees.
fn recording_registry(log: Arc<Mutex<Vec<String>>>) -> CompensationRegistry {
    CompensationRegistry::new()
        .with_fn("record", move |d: CompensationDescriptor| {
            let log = log.clone();
            async move {
                let id = d.str_param("id")?.to_string();
                log.lock().push(id);
                Ok::<_, CompensationError>(())
            }
        })
        .with_fn("explode", |_d| async {
            Err::<(), _>(CompensationError::Failed("rollback refused".to_string()))
        })
}

fn output_with(kind: &str, id: &str) -> StepOutput {
    StepOutput::new().with_compensation(CompensationDescriptor::new(kind).with_param("id", id))
}

#[tokio::test]
async fn test_compensations_drain_in_lifo_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = recording_registry(log.clone());

    let mut saga = SagaState::new("wf-1");
    saga.record_success("s1", &output_with("record", "C1"));
    saga.record_success("s2", &output_with("record", "C2"));
    saga.record_success("s3", &output_with("record", "C3"));

    let report = saga.compensate(&registry).await;

    assert_eq!(*log.lock(), vec!["C3", "C2", "C1"]);
    assert_eq!(report.attempted(), 3);
    assert!(report.is_clean());
    assert_eq!(saga.pending(), 0);
}

#[tokio::test]
async fn test_failed_compensation_does_not_halt_draining() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = recording_registry(log.clone());

    let mut saga = SagaState::new("wf-1");
    saga.record_success("s1", &output_with("record", "C1"));
    saga.record_success("s2", &StepOutput::new().with_compensation(CompensationDescriptor::new("explode")));
    saga.record_success("s3", &output_with("record", "C3"));

    let report = saga.compensate(&registry).await;

    assert_eq!(*log.lock(), vec!["C3", "C1"]);
    assert_eq!(report.invoked, vec!["record", "explode", "record"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].step, "s2");
    assert!(report.failures[0].error.contains("rollback refused"));
}

#[tokio::test]
async fn test_unknown_kind_is_recorded_as_failure() {
    let registry = CompensationRegistry::new();
    let mut saga = SagaState::new("wf-1");
    saga.record_success("setup", &StepOutput::new().with_compensation(CompensationDescriptor::new("vanish")));

    let report = saga.compensate(&registry).await;
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.contains("vanish"));
}

#[test]
fn test_steps_without_compensation_only_track_progress() {
    let mut saga = SagaState::new("wf-1");
    saga.record_success("analyze", &StepOutput::new().with("files", 12));
    saga.record_success(
        "report",
        &StepOutput::new().with_artifacts(["README.md", "docs/API.md"]),
    );

    assert_eq!(saga.steps_completed(), &["analyze".to_string(), "report".to_string()]);
    assert_eq!(saga.artifacts(), &["README.md".to_string(), "docs/API.md".to_string()]);
    assert_eq!(saga.pending(), 0);

    let view = saga.view();
    assert_eq!(view.steps_completed.len(), 2);
    assert_eq!(view.pending_compensations, 0);
}

#[tokio::test]
async fn test_from_pending_restores_stack_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = recording_registry(log.clone());

    let pending = vec![
        ("s1".to_string(), CompensationDescriptor::new("record").with_param("id", "first")),
        ("s2".to_string(), CompensationDescriptor::new("record").with_param("id", "second")),
    ];
    let mut saga = SagaState::from_pending("wf-7", pending);
    assert_eq!(saga.workflow_id(), "wf-7");
    assert_eq!(saga.pending(), 2);

    saga.compensate(&registry).await;
    assert_eq!(*log.lock(), vec!["second", "first"]);
}

#[test]
fn test_saga_state_serializes() {
    let mut saga = SagaState::new("wf-1");
    saga.record_success("s1", &output_with("record", "C1"));

    let json = serde_json::to_string(&saga).unwrap();
    let back: SagaState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, saga);
}
