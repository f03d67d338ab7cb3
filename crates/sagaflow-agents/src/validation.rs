//! Validation agent: evaluates a workflow's artifacts against a weighted
//! checklist.
//!
//! Checks read their inputs from the `metrics` variable. Any metric left out
//! falls back to the value of a healthy project, so an empty `metrics` map
//! passes every check.

#[cfg(test)]
#[path = "validation_tests.rs"]
mod tests;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sagaflow_core::{StepAgent, StepAgentBuilder};
use sagaflow_protocols::{
    AGENT_TYPE_VALIDATION, ResultKind, Scores, Step, StepError, StepInput, StepOutput, Values,
    get_as, get_f64,
};

/// Score at or above which a run with failures is still `partial`.
pub const PARTIAL_THRESHOLD: f64 = 0.8;

const OSI_LICENSES: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "ISC",
    "MPL-2.0",
    "GPL-3.0",
    "LGPL-3.0",
];

/// Category steps, in run order: (step name, category name, results key).
const CATEGORY_STEPS: [(&str, &str, &str); 4] = [
    ("validate_code_quality", "Code Quality", "code_quality"),
    ("validate_security", "Security", "security"),
    ("validate_performance", "Performance", "performance"),
    ("validate_compliance", "Compliance", "compliance"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckCategory {
    pub name: String,
    pub weight: f64,
    pub checks: Vec<CheckItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    pub id: String,
    pub name: String,
    pub categories: Vec<CheckCategory>,
}

impl Checklist {
    pub fn total_checks(&self) -> usize {
        self.categories.iter().map(|c| c.checks.len()).sum()
    }

    pub fn category(&self, name: &str) -> Option<&CheckCategory> {
        self.categories.iter().find(|c| c.name == name)
    }
}

fn item(id: &str, name: &str, description: &str, required: bool) -> CheckItem {
    CheckItem {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        required,
    }
}

/// The standard four-category checklist.
pub fn standard_checklist(id: &str) -> Checklist {
    Checklist {
        id: id.to_string(),
        name: "Standard Validation Checklist".to_string(),
        categories: vec![
            CheckCategory {
                name: "Code Quality".to_string(),
                weight: 0.30,
                checks: vec![
                    item("cq-001", "Test Coverage", "Minimum 80% test coverage", true),
                    item("cq-002", "Code Complexity", "Cyclomatic complexity under 15", true),
                    item("cq-003", "Documentation", "Public APIs documented", true),
                ],
            },
            CheckCategory {
                name: "Security".to_string(),
                weight: 0.30,
                checks: vec![
                    item("sec-001", "Dependency Audit", "No known vulnerabilities in dependencies", true),
                    item("sec-002", "Secret Detection", "No secrets in code", true),
                    item("sec-003", "Input Validation", "All inputs validated", true),
                ],
            },
            CheckCategory {
                name: "Performance".to_string(),
                weight: 0.20,
                checks: vec![
                    item("perf-001", "Response Time", "API response time under 100ms", true),
                    item("perf-002", "Memory Usage", "Memory usage within limits", false),
                ],
            },
            CheckCategory {
                name: "Compliance".to_string(),
                weight: 0.20,
                checks: vec![
                    item("comp-001", "License Check", "Compatible licenses only", true),
                    item("comp-002", "Code Standards", "Follows project coding standards", true),
                ],
            },
        ],
    }
}

/// Measurements the checks are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub test_coverage: f64,
    pub complexity: f64,
    pub doc_coverage: f64,
    pub critical_vulnerabilities: u32,
    pub high_vulnerabilities: u32,
    pub secrets_found: u32,
    pub input_validation: bool,
    pub p95_latency_ms: f64,
    pub memory_mb: f64,
    pub license: String,
    pub lint_passed: bool,
    pub format_passed: bool,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            test_coverage: 87.5,
            complexity: 8.2,
            doc_coverage: 75.0,
            critical_vulnerabilities: 0,
            high_vulnerabilities: 0,
            secrets_found: 0,
            input_validation: true,
            p95_latency_ms: 54.0,
            memory_mb: 45.0,
            license: "MIT".to_string(),
            lint_passed: true,
            format_passed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Passed,
    Warning,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_id: String,
    pub name: String,
    pub category: String,
    pub status: CheckStatus,
    pub score: f64,
    pub max_score: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

/// Checks of one category as written by its step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOutcome {
    pub category: String,
    pub weight: f64,
    pub checks: Vec<CheckResult>,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Passed,
    Partial,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub workflow_id: String,
    pub checklist_id: String,
    pub overall_score: f64,
    pub weighted_score: f64,
    pub status: ValidationStatus,
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub warning_checks: usize,
    pub skipped_checks: usize,
    pub category_scores: Values,
    pub summary: String,
    pub recommendations: Vec<String>,
}

fn count(checks: &[CheckResult], status: CheckStatus) -> usize {
    checks.iter().filter(|c| c.status == status).count()
}

/// `(passed + 0.5 * warnings) / total`, or 0 without checks.
pub fn validation_score(checks: &[CheckResult]) -> f64 {
    if checks.is_empty() {
        return 0.0;
    }
    let passed = count(checks, CheckStatus::Passed) as f64;
    let warnings = count(checks, CheckStatus::Warning) as f64;
    (passed + 0.5 * warnings) / checks.len() as f64
}

pub fn determine_status(checks: &[CheckResult]) -> ValidationStatus {
    if count(checks, CheckStatus::Failed) == 0 {
        ValidationStatus::Passed
    } else if validation_score(checks) >= PARTIAL_THRESHOLD {
        ValidationStatus::Partial
    } else {
        ValidationStatus::Failed
    }
}

/// Graded outcome: `(status, score out of 100, message, suggestion)`.
type Verdict = (CheckStatus, f64, String, Option<&'static str>);

fn grade(pass: bool, warn: bool) -> CheckStatus {
    match (pass, warn) {
        (true, _) => CheckStatus::Passed,
        (false, true) => CheckStatus::Warning,
        (false, false) => CheckStatus::Failed,
    }
}

fn is_osi_license(license: &str) -> bool {
    license
        .split(" OR ")
        .flat_map(|l| l.split(" AND "))
        .all(|l| OSI_LICENSES.contains(&l.trim()))
}

fn evaluate(check: &CheckItem, m: &Metrics) -> Verdict {
    match check.id.as_str() {
        "cq-001" => (
            grade(m.test_coverage >= 80.0, m.test_coverage >= 60.0),
            m.test_coverage.clamp(0.0, 100.0),
            format!("Test coverage is {}% (target: 80%)", m.test_coverage),
            Some("Add tests for uncovered code paths"),
        ),
        "cq-002" => {
            let status = grade(m.complexity < 15.0, m.complexity < 20.0);
            (
                status,
                if m.complexity < 15.0 { 100.0 } else { 50.0 },
                format!("Average complexity is {} (target: < 15)", m.complexity),
                Some("Split complex functions into smaller units"),
            )
        }
        "cq-003" => (
            grade(m.doc_coverage >= 60.0, m.doc_coverage >= 40.0),
            m.doc_coverage.clamp(0.0, 100.0),
            format!("Documentation coverage is {}% (target: 60%)", m.doc_coverage),
            Some("Document public APIs"),
        ),
        "sec-001" => {
            let clean = m.critical_vulnerabilities == 0 && m.high_vulnerabilities == 0;
            (
                grade(clean, m.critical_vulnerabilities == 0),
                if clean { 100.0 } else { 0.0 },
                format!(
                    "{} critical and {} high vulnerabilities in dependencies",
                    m.critical_vulnerabilities, m.high_vulnerabilities
                ),
                Some("Upgrade vulnerable dependencies"),
            )
        }
        "sec-002" => (
            grade(m.secrets_found == 0, false),
            if m.secrets_found == 0 { 100.0 } else { 0.0 },
            format!("{} secrets detected in code", m.secrets_found),
            Some("Move secrets to environment configuration"),
        ),
        "sec-003" => (
            grade(m.input_validation, false),
            if m.input_validation { 95.0 } else { 0.0 },
            if m.input_validation {
                "Input validation present in all public APIs".to_string()
            } else {
                "Public APIs accept unvalidated input".to_string()
            },
            Some("Validate inputs at API boundaries"),
        ),
        "perf-001" => (
            grade(m.p95_latency_ms < 100.0, m.p95_latency_ms < 200.0),
            if m.p95_latency_ms < 100.0 { 95.0 } else { 50.0 },
            format!("P95 latency is {}ms (target: < 100ms)", m.p95_latency_ms),
            Some("Profile the slowest endpoints"),
        ),
        "perf-002" => (
            grade(m.memory_mb < 512.0, !check.required),
            if m.memory_mb < 512.0 { 100.0 } else { 50.0 },
            format!("Memory usage is {}MB (target: < 512MB)", m.memory_mb),
            Some("Reduce peak memory usage"),
        ),
        "comp-001" => {
            let ok = is_osi_license(&m.license);
            (
                grade(ok, false),
                if ok { 100.0 } else { 0.0 },
                format!("License '{}'", m.license),
                Some("Use an OSI approved license"),
            )
        }
        "comp-002" => (
            grade(
                m.lint_passed && m.format_passed,
                m.lint_passed || m.format_passed,
            ),
            match (m.lint_passed, m.format_passed) {
                (true, true) => 100.0,
                (false, false) => 0.0,
                _ => 50.0,
            },
            format!("lint passed: {}, formatting passed: {}", m.lint_passed, m.format_passed),
            Some("Run the linter and formatter before committing"),
        ),
        _ => (CheckStatus::Skipped, 0.0, "No evaluator for check".to_string(), None),
    }
}

/// Evaluate one check of `category`.
pub fn run_check(category: &str, check: &CheckItem, metrics: &Metrics) -> CheckResult {
    let (status, score, message, suggestion) = evaluate(check, metrics);
    let suggestions = match (status, suggestion) {
        (CheckStatus::Failed | CheckStatus::Warning, Some(s)) => vec![s.to_string()],
        _ => Vec::new(),
    };
    CheckResult {
        check_id: check.id.clone(),
        name: check.name.clone(),
        category: category.to_string(),
        status,
        score,
        max_score: 100.0,
        message,
        suggestions,
    }
}

async fn load_checklist(input: StepInput) -> Result<StepOutput, StepError> {
    let checklist_id = input.variable_str("checklist_id").unwrap_or("default");
    let checklist = standard_checklist(checklist_id);

    StepOutput::new()
        .with("total_checks", checklist.total_checks())
        .with("categories", checklist.categories.len())
        .with_json("checklist", &checklist)
}

async fn validate_category(
    input: StepInput,
    category: &'static str,
    key: &'static str,
) -> Result<StepOutput, StepError> {
    let checklist: Checklist = input.result_as("checklist")?;
    let metrics: Metrics = match input.variable("metrics") {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| StepError::InvalidInput(format!("invalid metrics: {}", e)))?,
        None => Metrics::default(),
    };

    let (weight, checks) = match checklist.category(category) {
        Some(cat) => (
            cat.weight,
            cat.checks
                .iter()
                .map(|check| run_check(category, check, &metrics))
                .collect::<Vec<_>>(),
        ),
        None => (0.0, Vec::new()),
    };
    debug!("Validated {} checks in category {}", checks.len(), category);

    let outcome = CategoryOutcome {
        category: category.to_string(),
        weight,
        passed: count(&checks, CheckStatus::Passed),
        failed: count(&checks, CheckStatus::Failed),
        checks,
    };
    StepOutput::new().with_json(key, &outcome)
}

fn generate_summary(checks: &[CheckResult]) -> String {
    format!(
        "Validation completed: {}/{} checks passed, {} failed",
        count(checks, CheckStatus::Passed),
        checks.len(),
        count(checks, CheckStatus::Failed)
    )
}

fn generate_recommendations(checks: &[CheckResult]) -> Vec<String> {
    let mut recommendations: Vec<String> = checks
        .iter()
        .filter(|c| matches!(c.status, CheckStatus::Failed | CheckStatus::Warning))
        .flat_map(|c| c.suggestions.iter().cloned())
        .collect();
    if recommendations.is_empty() {
        recommendations.push("All checks passed. No recommendations.".to_string());
    }
    recommendations
}

async fn generate_validation_report(input: StepInput) -> Result<StepOutput, StepError> {
    let checklist: Checklist = input.result_as("checklist")?;

    let outcomes: Vec<CategoryOutcome> = CATEGORY_STEPS
        .iter()
        .filter_map(|(_, _, key)| get_as(&input.results, key))
        .collect();

    let mut all_checks = Vec::new();
    let mut category_scores = Values::new();
    let mut weighted = 0.0;
    let mut weights = 0.0;
    for outcome in &outcomes {
        let score = validation_score(&outcome.checks);
        category_scores.insert(outcome.category.clone(), score.into());
        weighted += outcome.weight * score;
        weights += outcome.weight;
        all_checks.extend(outcome.checks.iter().cloned());
    }

    let overall = validation_score(&all_checks);
    let report = ValidationReport {
        workflow_id: input.workflow_id.clone(),
        checklist_id: checklist.id,
        overall_score: overall,
        weighted_score: if weights > 0.0 { weighted / weights } else { 0.0 },
        status: determine_status(&all_checks),
        total_checks: all_checks.len(),
        passed_checks: count(&all_checks, CheckStatus::Passed),
        failed_checks: count(&all_checks, CheckStatus::Failed),
        warning_checks: count(&all_checks, CheckStatus::Warning),
        skipped_checks: count(&all_checks, CheckStatus::Skipped),
        category_scores,
        summary: generate_summary(&all_checks),
        recommendations: generate_recommendations(&all_checks),
    };

    StepOutput::new()
        .with("passed", report.status == ValidationStatus::Passed)
        .with("score", overall)
        .with_json("validation_report", &report)
}

/// Confidence is the validation score; quality is the same on a 0-10 scale.
pub fn score_validation(results: &Values) -> Scores {
    let score = get_f64(results, "score").unwrap_or(0.0);
    Scores::new(score, score * 10.0)
}

fn category_step(name: &'static str, category: &'static str, key: &'static str, minutes: u64) -> Step {
    Step::from_fn(name, format!("Run {} checks", category), move |_ctx, input| {
        validate_category(input, category, key)
    })
    .with_timeout(Duration::from_secs(minutes * 60))
    .with_retries(1)
}

pub fn validation_agent(id: &str) -> StepAgentBuilder {
    let [code_quality, security, performance, compliance] = CATEGORY_STEPS;

    StepAgent::builder(id, AGENT_TYPE_VALIDATION, ResultKind::Validation)
        .capabilities([
            "code_review",
            "security_audit",
            "performance_validation",
            "compliance_check",
            "checklist_validation",
        ])
        .steps([
            Step::from_fn("load_checklist", "Load the validation checklist", |_ctx, input| {
                load_checklist(input)
            })
            .with_timeout(Duration::from_secs(2 * 60))
            .with_retries(1),
            category_step(code_quality.0, code_quality.1, code_quality.2, 5),
            category_step(security.0, security.1, security.2, 5),
            category_step(performance.0, performance.1, performance.2, 5),
            category_step(compliance.0, compliance.1, compliance.2, 3),
            Step::from_fn(
                "generate_validation_report",
                "Write the validation report",
                |_ctx, input| generate_validation_report(input),
            )
            .with_timeout(Duration::from_secs(5 * 60))
            .with_retries(1),
        ])
        .scorer(score_validation)
        .artifacts(["validation_report.json", "compliance_checklist.md"])
        .timeout(Duration::from_secs(20 * 60))
}
