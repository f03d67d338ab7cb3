use super::*;
use crate::testing::{build, run, vars};
use sagaflow_protocols::{Agent, AgentError};

fn names(findings: &[LibraryFinding]) -> Vec<&str> {
    findings.iter().map(|f| f.name.as_str()).collect()
}

#[test]
fn test_discover_orders_by_matches_then_downloads() {
    let findings = discover("sqlite", Some("rust"));
    assert_eq!(names(&findings), vec!["sqlx", "rusqlite"]);
    assert_eq!(findings[0].documentation_url, "https://docs.rs/sqlx");

    let findings = discover("blocking http client", Some("cargo"));
    assert_eq!(findings[0].name, "ureq");
    assert_eq!(findings[0].relevance_score, 1.0);
}

#[test]
fn test_discover_filters_by_ecosystem() {
    let findings = discover("http client", Some("python"));
    assert_eq!(names(&findings), vec!["requests"]);

    let findings = discover("http client", None);
    assert_eq!(findings.len(), DISCOVERY_LIMIT);
    assert!(findings.iter().any(|f| f.registry == "npm"));
}

#[test]
fn test_discover_without_matches() {
    assert!(discover("", None).is_empty());
    assert!(discover("quantum teleportation", None).is_empty());
}

#[test]
fn test_score_findings() {
    assert_eq!(score_findings(&Values::new()), Scores::new(0.0, 0.0));

    let single = vars([(
        "libraries",
        json!([{ "name": "tokio", "confidence_score": 0.95 }]),
    )]);
    let scores = score_findings(&single);
    assert!((scores.confidence() - 0.95).abs() < 1e-9);
    assert_eq!(scores.quality(), 7.5);

    let several = vars([(
        "libraries",
        json!([
            { "name": "a", "confidence_score": 0.98 },
            { "name": "b", "confidence_score": 0.96 },
            { "name": "c", "confidence_score": 0.99 },
        ]),
    )]);
    let scores = score_findings(&several);
    assert_eq!(scores.confidence(), 1.0);
    assert_eq!(scores.quality(), 9.5);
}

#[tokio::test]
async fn test_research_run() {
    let agent = build(research_agent("research-1"));
    let result = run(
        &agent,
        vars([
            ("query", json!("sqlite database")),
            ("ecosystem", json!("rust")),
        ]),
    )
    .await
    .unwrap();

    assert_eq!(result.result_kind, ResultKind::Findings);
    assert_eq!(result.data["libraries_found"], 2);
    assert_eq!(result.data["libraries_analyzed"], 2);
    assert_eq!(result.data["summary"]["primary_recommendation"], "sqlx");
    assert_eq!(result.data["analysis_summary"]["sources"], json!(["crates.io"]));
    assert_eq!(result.data["static_analysis"][1]["maturity"], "mature");

    assert!((result.confidence_score() - 0.94).abs() < 1e-9);
    assert_eq!(result.quality_score(), 8.0);
    assert_eq!(
        result.artifacts,
        vec![
            "research_findings.json",
            "library_comparison.md",
            "recommendations.md"
        ]
    );
}

#[tokio::test]
async fn test_research_with_caller_candidates() {
    let agent = build(research_agent("research-2"));
    let result = run(
        &agent,
        vars([
            ("query", json!("anything")),
            (
                "candidates",
                json!([
                    { "name": "small", "downloads": 10, "registry": "internal", "confidence_score": 0.6 },
                    { "name": "big", "downloads": 5000, "registry": "internal", "confidence_score": 0.8 },
                ]),
            ),
        ]),
    )
    .await
    .unwrap();

    assert_eq!(result.data["summary"]["primary_recommendation"], "big");
    assert_eq!(result.data["recommendations"][1]["library"], "small");
    assert_eq!(result.data["static_analysis"][0]["maturity"], "new");
}

#[tokio::test]
async fn test_research_requires_query() {
    let agent = build(research_agent("research-3"));
    let err = run(&agent, Values::new()).await.unwrap_err();

    assert!(matches!(err, AgentError::StepFailed { ref step, .. } if step == "library_discovery"));
    assert!(err.to_string().contains("research query is required"));
}

#[tokio::test]
async fn test_research_without_matches_scores_zero() {
    let agent = build(research_agent("research-4"));
    let result = run(&agent, vars([("query", json!("quantum"))])).await.unwrap();

    assert_eq!(result.data["summary"]["primary_recommendation"], "");
    assert_eq!(result.data["analysis_summary"]["sources"], json!(["none"]));
    assert_eq!(result.confidence_score(), 0.0);
    assert_eq!(result.quality_score(), 0.0);
}

#[test]
fn test_research_agent_shape() {
    let agent = research_agent("r").build();
    let steps: Vec<_> = agent.steps().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        steps,
        vec![
            "library_discovery",
            "documentation_analysis",
            "static_analysis",
            "findings_synthesis"
        ]
    );
    assert_eq!(agent.steps()[0].retry_count, 2);
    assert_eq!(agent.timeout(), Some(Duration::from_secs(1800)));
    assert!(!agent.supports_compensation());
}
