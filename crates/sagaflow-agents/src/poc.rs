//! Proof-of-concept agent.
//!
//! Sets up a workspace, generates an implementation, builds, tests and
//! benchmarks it, then reports. The agent runs in saga mode: the workspace
//! and the generated files are rolled back when a later step fails.
//!
//! The variable `simulate_failure` names a step that should fail, which
//! exercises the rollback path without touching anything real.

#[cfg(test)]
#[path = "poc_tests.rs"]
mod tests;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use sagaflow_core::{CompensationRegistry, StepAgent, StepAgentBuilder};
use sagaflow_protocols::{
    AGENT_TYPE_POC, CompensationDescriptor, CompensationError, ResultKind, Scores, Step,
    StepError, StepInput, StepOutput, Values, get_as, get_bool,
};

/// Compensation kind undoing `setup_environment`.
pub const CLEANUP_WORKSPACE: &str = "cleanup_workspace";
/// Compensation kind undoing `generate_implementation`.
pub const REMOVE_GENERATED_FILES: &str = "remove_generated_files";

const TOTAL_TESTS: u64 = 15;
const TEST_COVERAGE: f64 = 87.5;

/// Outcome of the simulated test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub total_tests: u64,
    pub passed_tests: u64,
    pub failed_tests: u64,
    pub skipped_tests: u64,
    pub duration_ms: u64,
    pub coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    pub name: String,
    pub iterations: u64,
    pub duration_ns: u64,
    pub throughput: f64,
    pub memory_bytes: u64,
    pub allocations: u64,
}

fn tools_for(language: &str) -> Vec<&'static str> {
    match language {
        "rust" => vec!["cargo", "rustc", "clippy"],
        "python" => vec!["python", "pip", "pytest"],
        "go" => vec!["go", "gofmt", "golangci-lint"],
        _ => Vec::new(),
    }
}

fn files_for(language: &str) -> Vec<String> {
    let files: &[&str] = match language {
        "python" => &["main.py", "requirements.txt", "tests/test_main.py"],
        "go" => &["main.go", "go.mod", "main_test.go"],
        _ => &[
            "src/main.rs",
            "src/lib.rs",
            "Cargo.toml",
            "tests/integration_tests.rs",
        ],
    };
    files.iter().map(|f| f.to_string()).collect()
}

/// Wrap a step body with the `simulate_failure` hook.
fn poc_step<F, Fut>(
    name: &'static str,
    description: &'static str,
    timeout: Duration,
    retries: u32,
    body: F,
) -> Step
where
    F: Fn(StepInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepOutput, StepError>> + Send + 'static,
{
    Step::from_fn(name, description, move |_ctx, input: StepInput| {
        let simulated = input.variable_str("simulate_failure") == Some(name);
        let body = body(input);
        async move {
            if simulated {
                return Err(StepError::failed(format!("simulated failure in {}", name)));
            }
            body.await
        }
    })
    .with_timeout(timeout)
    .with_retries(retries)
}

async fn setup_environment(input: StepInput) -> Result<StepOutput, StepError> {
    let language = input.variable_str("language").unwrap_or("rust").to_lowercase();
    let framework = input.variable_str("framework").unwrap_or("none");
    let workspace_dir = format!("/tmp/poc-{}", input.workflow_id);

    info!("Preparing {} workspace at {}", language, workspace_dir);

    Ok(StepOutput::new()
        .with(
            "environment",
            json!({
                "language": language,
                "framework": framework,
                "environment_ready": true,
                "tools_installed": tools_for(&language),
                "workspace_dir": workspace_dir,
            }),
        )
        .with_compensation(
            CompensationDescriptor::new(CLEANUP_WORKSPACE).with_param("workspace_dir", workspace_dir),
        ))
}

async fn generate_implementation(input: StepInput) -> Result<StepOutput, StepError> {
    let environment = input
        .result("environment")
        .ok_or_else(|| StepError::InvalidInput("environment is not set up".to_string()))?;
    let language = environment["language"].as_str().unwrap_or("rust").to_string();
    let workspace_dir = environment["workspace_dir"].as_str().unwrap_or_default().to_string();
    let feature = input.variable_str("feature").unwrap_or("basic_implementation");
    let files = files_for(&language);

    Ok(StepOutput::new()
        .with("generated_files", files.clone())
        .with(
            "code_metrics",
            json!({
                "lines_of_code": 150,
                "cyclomatic_complexity": 5.2,
                "maintainability_index": 85.0,
                "test_coverage": 0.0,
                "documentation_coverage": 60.0,
            }),
        )
        .with("feature", feature)
        .with("language", language)
        .with("implementation_type", "module")
        .with_artifacts(files.clone())
        .with_compensation(
            CompensationDescriptor::new(REMOVE_GENERATED_FILES)
                .with_param("files", files)
                .with_param("workspace_dir", workspace_dir),
        ))
}

async fn build_code(input: StepInput) -> Result<StepOutput, StepError> {
    let errors = input.variable("build_errors").and_then(Value::as_u64).unwrap_or(0);
    let build_success = errors == 0;

    let output = if build_success {
        "Compiling poc v0.1.0\nFinished dev profile [unoptimized + debuginfo]".to_string()
    } else {
        format!("error: could not compile `poc` due to {} previous errors", errors)
    };

    let mut step = StepOutput::new()
        .with("build_success", build_success)
        .with("build_output", output)
        .with("warnings", 2)
        .with("errors", errors);
    if build_success {
        step = step.with("binary_path", "target/debug/poc");
    }
    Ok(step)
}

async fn run_tests(input: StepInput) -> Result<StepOutput, StepError> {
    if !get_bool(&input.results, "build_success").unwrap_or(false) {
        return Err(StepError::failed("cannot run tests: build failed"));
    }

    let failed = input
        .variable("failing_tests")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .min(TOTAL_TESTS);
    let results = TestResults {
        total_tests: TOTAL_TESTS,
        passed_tests: TOTAL_TESTS - failed,
        failed_tests: failed,
        skipped_tests: 0,
        duration_ms: 2340,
        coverage: TEST_COVERAGE,
    };

    StepOutput::new()
        .with("test_success", failed == 0)
        .with_json("test_results", &results)
}

async fn benchmark_performance(input: StepInput) -> Result<StepOutput, StepError> {
    if input.variable("benchmarks").and_then(Value::as_bool) == Some(false) {
        return Ok(StepOutput::new()
            .with("benchmark_success", true)
            .with("benchmark_skipped", true));
    }
    if !get_bool(&input.results, "test_success").unwrap_or(false) {
        warn!("Some tests failed for workflow {}, benchmarking anyway", input.workflow_id);
    }

    let benchmarks = vec![
        Benchmark {
            name: "bench_basic_operations".to_string(),
            iterations: 100_000,
            duration_ns: 5400,
            throughput: 185_185.18,
            memory_bytes: 128,
            allocations: 2,
        },
        Benchmark {
            name: "bench_concurrent_access".to_string(),
            iterations: 50_000,
            duration_ns: 12_300,
            throughput: 81_300.81,
            memory_bytes: 256,
            allocations: 4,
        },
    ];

    StepOutput::new()
        .with(
            "performance_metrics",
            json!({
                "latency_avg_ms": 5.4,
                "latency_p95_ms": 8.2,
                "latency_p99_ms": 12.5,
                "throughput_rps": 185_185,
                "memory_usage_mb": 45.2,
                "cpu_usage_percent": 35.8,
            }),
        )
        .with("benchmark_success", true)
        .with_json("benchmarks", &benchmarks)
}

/// Final verdict for a run.
pub fn recommendation(build_success: bool, test_success: bool) -> &'static str {
    match (build_success, test_success) {
        (true, true) => "production_ready",
        (true, false) => "needs_testing",
        (false, _) => "needs_fixes",
    }
}

async fn cleanup_and_report(input: StepInput) -> Result<StepOutput, StepError> {
    let build_success = get_bool(&input.results, "build_success").unwrap_or(false);
    let test_success = get_bool(&input.results, "test_success").unwrap_or(false);
    let (steps_completed, artifacts_generated) = input
        .saga
        .as_ref()
        .map(|saga| (saga.steps_completed.len(), saga.artifacts.len()))
        .unwrap_or_default();

    Ok(StepOutput::new()
        .with(
            "report",
            json!({
                "build_success": build_success,
                "test_success": test_success,
                "overall_success": build_success && test_success,
                "steps_completed": steps_completed,
                "total_steps": input.total_steps,
                "artifacts_generated": artifacts_generated,
                "recommendation": recommendation(build_success, test_success),
            }),
        )
        .with(
            "summary",
            format!("POC completed with build={}, tests={}", build_success, test_success),
        )
        .with_artifacts([
            "poc_implementation.tar.gz",
            "test_report.json",
            "benchmark_results.json",
            "performance_analysis.md",
        ]))
}

/// Confidence from build and test outcomes plus a coverage bonus.
pub fn score_poc(results: &Values) -> Scores {
    let build = get_bool(results, "build_success").unwrap_or(false);
    let tests = get_bool(results, "test_success").unwrap_or(false);
    let coverage = get_as::<TestResults>(results, "test_results")
        .map(|t| t.coverage / 100.0)
        .unwrap_or(0.0);

    let mut confidence = 0.5 + coverage * 0.1;
    let mut quality = 5.0 + coverage;
    if build {
        confidence += 0.25;
        quality += 2.0;
    }
    if tests {
        confidence += 0.25;
        quality += 2.0;
    }
    Scores::new(confidence, quality)
}

fn generated_files(descriptor: &CompensationDescriptor) -> Result<Vec<String>, CompensationError> {
    descriptor
        .params
        .get("files")
        .and_then(|files| serde_json::from_value(files.clone()).ok())
        .ok_or_else(|| {
            CompensationError::InvalidParams(format!(
                "{} requires a 'files' list",
                descriptor.kind
            ))
        })
}

/// Handlers undoing the workspace and the generated files.
pub fn poc_compensations() -> CompensationRegistry {
    CompensationRegistry::new()
        .with_fn(CLEANUP_WORKSPACE, |descriptor: CompensationDescriptor| async move {
            let dir = descriptor.str_param("workspace_dir")?;
            info!("Removing POC workspace {}", dir);
            Ok::<_, CompensationError>(())
        })
        .with_fn(REMOVE_GENERATED_FILES, |descriptor: CompensationDescriptor| async move {
            let files = generated_files(&descriptor)?;
            info!("Removing {} generated POC files", files.len());
            Ok::<_, CompensationError>(())
        })
}

pub fn poc_agent(id: &str) -> StepAgentBuilder {
    const MINUTE: u64 = 60;

    StepAgent::builder(id, AGENT_TYPE_POC, ResultKind::PocResults)
        .capabilities([
            "code_generation",
            "build_automation",
            "test_execution",
            "benchmarking",
            "rollback",
        ])
        .steps([
            poc_step(
                "setup_environment",
                "Prepare the POC workspace",
                Duration::from_secs(5 * MINUTE),
                2,
                setup_environment,
            ),
            poc_step(
                "generate_implementation",
                "Generate the implementation",
                Duration::from_secs(10 * MINUTE),
                2,
                generate_implementation,
            ),
            poc_step(
                "build_code",
                "Build the generated code",
                Duration::from_secs(10 * MINUTE),
                1,
                build_code,
            ),
            poc_step(
                "run_tests",
                "Run the test suite",
                Duration::from_secs(10 * MINUTE),
                1,
                run_tests,
            ),
            poc_step(
                "benchmark_performance",
                "Run performance benchmarks",
                Duration::from_secs(8 * MINUTE),
                1,
                benchmark_performance,
            ),
            poc_step(
                "cleanup_and_report",
                "Summarize the POC",
                Duration::from_secs(5 * MINUTE),
                1,
                cleanup_and_report,
            ),
        ])
        .scorer(score_poc)
        .compensations(poc_compensations())
        .timeout(Duration::from_secs(45 * MINUTE))
}
