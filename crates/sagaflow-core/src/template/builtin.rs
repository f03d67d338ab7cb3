//! Templates registered by [`TemplateManager::with_builtin_templates`].
//!
//! [`TemplateManager::with_builtin_templates`]: super::TemplateManager::with_builtin_templates

use serde_json::{Value, json};

use sagaflow_protocols::{
    AGENT_TYPE_DOCUMENTATION, AGENT_TYPE_POC, AGENT_TYPE_RESEARCH, AGENT_TYPE_VALIDATION,
    TemplateConfig, TemplateStep, Values, WorkflowTemplate,
};

const MINUTE: u64 = 60;

fn vars(pairs: &[(&str, Value)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn config(max_retries: u32, timeout_mins: u64, continue_on_error: bool) -> TemplateConfig {
    TemplateConfig {
        max_retries,
        timeout_secs: timeout_mins * MINUTE,
        continue_on_error,
    }
}

fn step(name: &str, description: &str, timeout_mins: u64, retries: u32) -> TemplateStep {
    TemplateStep::new(name, description, timeout_mins * MINUTE, retries)
}

fn template(
    id: &str,
    name: &str,
    description: &str,
    agent_type: &str,
    steps: Vec<TemplateStep>,
    variables: Values,
    config: TemplateConfig,
) -> WorkflowTemplate {
    WorkflowTemplate {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        agent_type: agent_type.to_string(),
        steps,
        variables,
        config,
    }
}

pub fn builtin_templates() -> Vec<WorkflowTemplate> {
    vec![
        template(
            "research-basic",
            "Basic Research",
            "Library discovery, documentation review and a findings summary",
            AGENT_TYPE_RESEARCH,
            vec![
                step("library_discovery", "Find candidate libraries for the query", 5, 2),
                step("documentation_analysis", "Review candidate documentation", 10, 2),
                step("findings_synthesis", "Summarize findings and recommendations", 5, 1),
            ],
            vars(&[("focus", json!("general"))]),
            config(3, 30, false),
        ),
        template(
            "research-performance",
            "Performance Research",
            "Research focused on benchmarks and runtime characteristics",
            AGENT_TYPE_RESEARCH,
            vec![
                step("library_discovery", "Find candidate libraries for the query", 5, 2)
                    .with_parameter("criteria", json!(["performance", "benchmarks"])),
                step("documentation_analysis", "Review candidate documentation", 10, 2),
                step("static_analysis", "Inspect candidate source for hot paths", 8, 1),
                step("findings_synthesis", "Summarize findings and recommendations", 5, 1),
            ],
            vars(&[("focus", json!("performance"))]),
            config(3, 30, false),
        ),
        template(
            "poc-basic",
            "Basic POC",
            "Generate, build and test a proof of concept",
            AGENT_TYPE_POC,
            vec![
                step("setup_environment", "Create an isolated workspace", 5, 2),
                step("generate_implementation", "Generate the implementation", 10, 2),
                step("build_code", "Build the generated code", 10, 1),
                step("run_tests", "Run the test suite", 10, 1),
                step("cleanup_and_report", "Package artifacts and write the report", 5, 1),
            ],
            vars(&[("language", json!("rust"))]),
            config(3, 45, false),
        ),
        template(
            "poc-full",
            "Full POC with Benchmarks",
            "Proof of concept including a benchmark pass",
            AGENT_TYPE_POC,
            vec![
                step("setup_environment", "Create an isolated workspace", 5, 2),
                step("generate_implementation", "Generate the implementation", 10, 2),
                step("build_code", "Build the generated code", 10, 1),
                step("run_tests", "Run the test suite", 10, 1),
                step("benchmark_performance", "Run benchmarks", 8, 1),
                step("cleanup_and_report", "Package artifacts and write the report", 5, 1),
            ],
            vars(&[("language", json!("rust")), ("benchmarks", json!(true))]),
            config(3, 50, false),
        ),
        template(
            "docs-basic",
            "Basic Documentation",
            "README and API reference for a codebase",
            AGENT_TYPE_DOCUMENTATION,
            vec![
                step("analyze_codebase", "Scan the codebase structure", 5, 1),
                step("extract_api_definitions", "Collect public API definitions", 8, 1),
                step("generate_readme", "Write the README", 5, 1),
                step("validate_documentation", "Check documentation completeness", 5, 1),
            ],
            vars(&[("include_examples", json!(true))]),
            config(2, 30, false),
        ),
        template(
            "docs-comprehensive",
            "Comprehensive Documentation",
            "API docs, README and architecture overview",
            AGENT_TYPE_DOCUMENTATION,
            vec![
                step("analyze_codebase", "Scan the codebase structure", 5, 1),
                step("extract_api_definitions", "Collect public API definitions", 8, 1),
                step("generate_api_docs", "Write the API reference", 10, 1),
                step("generate_readme", "Write the README", 5, 1),
                step("generate_architecture_docs", "Describe the architecture", 7, 1),
                step("validate_documentation", "Check documentation completeness", 5, 1),
            ],
            vars(&[
                ("include_examples", json!(true)),
                ("include_architecture", json!(true)),
                ("include_diagrams", json!(true)),
            ]),
            config(2, 35, false),
        ),
        template(
            "validation-standard",
            "Standard Validation",
            "Code quality and security checks",
            AGENT_TYPE_VALIDATION,
            vec![
                step("load_checklist", "Load the validation checklist", 2, 1),
                step("validate_code_quality", "Run code quality checks", 5, 1),
                step("validate_security", "Run security checks", 5, 1),
                step("generate_validation_report", "Write the validation report", 5, 1),
            ],
            vars(&[("checklist_id", json!("default"))]),
            config(1, 20, true),
        ),
        template(
            "validation-full",
            "Full Validation",
            "Every checklist category including performance and compliance",
            AGENT_TYPE_VALIDATION,
            vec![
                step("load_checklist", "Load the validation checklist", 2, 1),
                step("validate_code_quality", "Run code quality checks", 5, 1),
                step("validate_security", "Run security checks", 5, 1),
                step("validate_performance", "Run performance checks", 5, 1),
                step("validate_compliance", "Run compliance checks", 3, 1),
                step("generate_validation_report", "Write the validation report", 5, 1),
            ],
            vars(&[("checklist_id", json!("default"))]),
            config(1, 25, true),
        ),
    ]
}
