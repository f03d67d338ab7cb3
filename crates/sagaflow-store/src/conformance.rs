//! Behavior shared by every store implementation.

use serde_json::json;

use sagaflow_protocols::{
    AgentResult, CompensationDescriptor, ResultKind, Scores, StepRecord, StoreError, Values,
    Workflow, WorkflowProgress, WorkflowStatus, WorkflowStore,
};

fn values(pairs: &[(&str, serde_json::Value)]) -> Values {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

pub async fn workflow_lifecycle(store: &dyn WorkflowStore) {
    let mut workflow = Workflow::new(
        "wf-1",
        "research",
        "research-1",
        values(&[("query", json!("async runtimes")), ("focus", json!("general"))]),
    )
    .with_title("Runtime survey");
    workflow.template_id = Some("research-basic".to_string());

    store.create_workflow(&workflow).await.unwrap();
    let loaded = store.get_workflow("wf-1").await.unwrap().unwrap();
    assert_eq!(loaded.title, "Runtime survey");
    assert_eq!(loaded.status, WorkflowStatus::Pending);
    assert_eq!(loaded.template_id.as_deref(), Some("research-basic"));
    let keys: Vec<_> = loaded.variables.keys().cloned().collect();
    assert_eq!(keys, vec!["query", "focus"]);

    store
        .update_status("wf-1", WorkflowStatus::Failed, Some("step 'x' failed"))
        .await
        .unwrap();
    let loaded = store.get_workflow("wf-1").await.unwrap().unwrap();
    assert_eq!(loaded.status, WorkflowStatus::Failed);
    assert_eq!(loaded.error.as_deref(), Some("step 'x' failed"));

    store
        .update_status("wf-1", WorkflowStatus::Completed, None)
        .await
        .unwrap();
    assert!(store.get_workflow("wf-1").await.unwrap().unwrap().error.is_none());

    assert!(store.get_workflow("missing").await.unwrap().is_none());
    let err = store
        .update_status("missing", WorkflowStatus::Active, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::WorkflowNotFound(_)));
}

pub async fn progress_upsert(store: &dyn WorkflowStore) {
    assert!(store.get_progress("wf-1").await.unwrap().is_none());

    store
        .upsert_progress(&WorkflowProgress::at_step("wf-1", 1, 4, "setup", WorkflowStatus::Active))
        .await
        .unwrap();
    store
        .upsert_progress(&WorkflowProgress::at_step("wf-1", 2, 4, "build", WorkflowStatus::Active))
        .await
        .unwrap();

    let progress = store.get_progress("wf-1").await.unwrap().unwrap();
    assert_eq!(progress.current_step, 2);
    assert_eq!(progress.total_steps, 4);
    assert_eq!(progress.progress_percent, 50.0);
    assert_eq!(progress.current_step_name, "build");
    assert_eq!(progress.status, WorkflowStatus::Active);
}

pub async fn step_log(store: &dyn WorkflowStore) {
    let cleanup = CompensationDescriptor::new("cleanup_workspace").with_param("workspace_dir", "/tmp/poc");

    store.record_step_start(&StepRecord::started("wf-1", 1, "setup")).await.unwrap();
    store
        .record_step_success("wf-1", 1, &values(&[("workspace_dir", json!("/tmp/poc"))]), Some(&cleanup))
        .await
        .unwrap();

    // Step 2 fails once, then a second run succeeds.
    store.record_step_start(&StepRecord::started("wf-1", 2, "build")).await.unwrap();
    store.record_step_failure("wf-1", 2, "compiler crashed").await.unwrap();
    store.record_step_start(&StepRecord::started("wf-1", 2, "build")).await.unwrap();
    store
        .record_step_success("wf-1", 2, &values(&[("build_success", json!(true))]), None)
        .await
        .unwrap();

    let records = store.step_records("wf-1").await.unwrap();
    assert_eq!(records.len(), 3);

    assert!(records[0].success);
    assert!(records[0].is_finished());
    assert_eq!(records[0].compensation.as_ref(), Some(&cleanup));
    assert_eq!(records[0].output.as_ref().unwrap()["workspace_dir"], json!("/tmp/poc"));

    assert!(!records[1].success);
    assert_eq!(records[1].error.as_deref(), Some("compiler crashed"));
    assert!(records[1].output.is_none());

    assert!(records[2].success);
    assert!(records[2].compensation.is_none());

    assert!(store.step_records("other").await.unwrap().is_empty());

    let err = store.record_step_failure("wf-1", 9, "nope").await.unwrap_err();
    assert!(matches!(err, StoreError::StepNotFound { step_number: 9, .. }));
}

pub async fn results(store: &dyn WorkflowStore) {
    let result = AgentResult::new(
        "wf-1",
        "poc",
        ResultKind::PocResults,
        values(&[("build_success", json!(true)), ("coverage", json!(85.5))]),
        Scores::new(0.95, 9.5),
    )
    .with_execution_time_ms(1234)
    .with_artifacts(vec!["test_report.json".to_string()]);

    store.store_result(&result).await.unwrap();
    let stored = store.results("wf-1").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, result.id);
    assert_eq!(stored[0].result_kind, ResultKind::PocResults);
    assert_eq!(stored[0].data, result.data);
    assert_eq!(stored[0].scores, result.scores);
    assert_eq!(stored[0].execution_time_ms, 1234);
    assert_eq!(stored[0].artifacts, vec!["test_report.json"]);

    assert!(store.results("wf-2").await.unwrap().is_empty());
}
