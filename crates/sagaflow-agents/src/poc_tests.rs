use super::*;
use crate::testing::{build, run, vars};
use sagaflow_protocols::{Agent, AgentError};

#[tokio::test]
async fn test_poc_default_run() {
    let agent = build(poc_agent("poc-1"));
    let result = run(&agent, Values::new()).await.unwrap();

    assert_eq!(result.result_kind, ResultKind::PocResults);
    assert_eq!(result.data["environment"]["language"], "rust");
    assert_eq!(result.data["environment"]["workspace_dir"], "/tmp/poc-wf-test");
    assert_eq!(result.data["binary_path"], "target/debug/poc");
    assert_eq!(result.data["test_results"]["failed_tests"], 1);
    assert_eq!(result.data["benchmarks"][1]["name"], "bench_concurrent_access");

    let report = &result.data["report"];
    assert_eq!(report["recommendation"], "needs_testing");
    assert_eq!(report["overall_success"], false);
    assert_eq!(report["steps_completed"], 5);
    assert_eq!(report["total_steps"], 6);
    assert_eq!(report["artifacts_generated"], 4);

    assert_eq!(result.artifacts.len(), 8);
    assert_eq!(result.artifacts[0], "src/main.rs");
    assert!(result.artifacts.contains(&"performance_analysis.md".to_string()));

    assert!((result.confidence_score() - 0.8375).abs() < 1e-9);
    assert!((result.quality_score() - 7.875).abs() < 1e-9);
}

#[tokio::test]
async fn test_poc_all_tests_passing() {
    let agent = build(poc_agent("poc-2"));
    let result = run(
        &agent,
        vars([
            ("language", json!("Python")),
            ("failing_tests", json!(0)),
            ("benchmarks", json!(false)),
        ]),
    )
    .await
    .unwrap();

    assert_eq!(result.data["generated_files"][0], "main.py");
    assert_eq!(result.data["benchmark_skipped"], true);
    assert_eq!(result.data["report"]["recommendation"], "production_ready");
    assert_eq!(result.confidence_score(), 1.0);
    assert!((result.quality_score() - 9.875).abs() < 1e-9);
}

#[tokio::test]
async fn test_build_failure_rolls_back() {
    let agent = build(poc_agent("poc-3"));
    let err = run(&agent, vars([("build_errors", json!(3))]))
        .await
        .unwrap_err();

    match err {
        AgentError::Compensated {
            step,
            attempted,
            source,
        } => {
            assert_eq!(step, "run_tests");
            assert_eq!(attempted, 2);
            assert!(source.to_string().contains("cannot run tests: build failed"));
        }
        other => panic!("expected rollback, got {other}"),
    }
}

#[tokio::test]
async fn test_simulated_failure_compensates_completed_steps() {
    let agent = build(poc_agent("poc-4"));

    let err = run(&agent, vars([("simulate_failure", json!("setup_environment"))]))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::Compensated { attempted: 0, .. }));

    let err = run(&agent, vars([("simulate_failure", json!("cleanup_and_report"))]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AgentError::Compensated { ref step, attempted: 2, .. } if step == "cleanup_and_report"
    ));
    assert!(err.to_string().contains("simulated failure in cleanup_and_report"));
}

#[tokio::test]
async fn test_compensations_run_newest_first() {
    let agent = poc_agent("poc-5").build();
    let report = agent
        .compensate(
            "wf-1",
            vec![
                (
                    "setup_environment".to_string(),
                    CompensationDescriptor::new(CLEANUP_WORKSPACE)
                        .with_param("workspace_dir", "/tmp/poc-wf-1"),
                ),
                (
                    "generate_implementation".to_string(),
                    CompensationDescriptor::new(REMOVE_GENERATED_FILES)
                        .with_param("files", json!(["src/main.rs"])),
                ),
            ],
        )
        .await;

    assert!(report.is_clean());
    assert_eq!(report.invoked, vec![REMOVE_GENERATED_FILES, CLEANUP_WORKSPACE]);
}

#[tokio::test]
async fn test_malformed_descriptors_are_reported() {
    let registry = poc_compensations();

    let err = registry
        .dispatch(&CompensationDescriptor::new(CLEANUP_WORKSPACE))
        .await
        .unwrap_err();
    assert!(matches!(err, CompensationError::InvalidParams(_)));

    let err = registry
        .dispatch(&CompensationDescriptor::new(REMOVE_GENERATED_FILES).with_param("files", "oops"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("files"));
}

#[test]
fn test_recommendation() {
    assert_eq!(recommendation(true, true), "production_ready");
    assert_eq!(recommendation(true, false), "needs_testing");
    assert_eq!(recommendation(false, false), "needs_fixes");
}

#[test]
fn test_poc_agent_shape() {
    let agent = poc_agent("p").build();
    let retries: Vec<_> = agent.steps().iter().map(|s| s.retry_count).collect();
    assert_eq!(retries, vec![2, 2, 1, 1, 1, 1]);
    assert_eq!(agent.steps()[4].timeout, Some(Duration::from_secs(480)));
    assert_eq!(agent.timeout(), Some(Duration::from_secs(2700)));
    assert!(agent.capabilities().contains(&"rollback".to_string()));
}
