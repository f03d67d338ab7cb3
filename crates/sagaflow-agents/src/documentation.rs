//! Documentation agent: API reference, README and architecture docs.

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use sagaflow_core::{StepAgent, StepAgentBuilder};
use sagaflow_protocols::{
    AGENT_TYPE_DOCUMENTATION, ResultKind, Scores, Step, StepError, StepInput, StepOutput, Values,
    get_bool, get_f64,
};

/// Confidence of a complete documentation set.
pub const BASELINE_CONFIDENCE: f64 = 0.88;
/// Quality of a complete documentation set.
pub const BASELINE_QUALITY: f64 = 8.8;

/// Sections checked by `validate_documentation`, with their quality scores.
const SECTIONS: [(&str, f64); 3] = [
    ("api_documentation", 0.92),
    ("readme", 0.88),
    ("architecture", 0.85),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeExample {
    pub title: String,
    pub code: String,
    pub language: String,
}

/// A public item extracted from the codebase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub api_type: String,
    pub signature: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<CodeExample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentationIssue {
    pub severity: String,
    pub location: String,
    pub description: String,
}

fn flag(input: &StepInput, key: &str) -> bool {
    input.variable(key).and_then(Value::as_bool).unwrap_or(true)
}

fn param(name: &str, param_type: &str, description: &str) -> Parameter {
    Parameter {
        name: name.to_string(),
        param_type: param_type.to_string(),
        description: description.to_string(),
    }
}

async fn analyze_codebase(input: StepInput) -> Result<StepOutput, StepError> {
    let source_path = input.variable_str("source_path").unwrap_or("./src");
    let language = input.variable_str("language").unwrap_or("rust");

    Ok(StepOutput::new().with(
        "codebase",
        json!({
            "source_path": source_path,
            "language": language,
            "total_files": 12,
            "total_modules": 5,
            "total_functions": 45,
            "total_structs": 8,
            "total_traits": 3,
            "file_structure": [
                "src/lib.rs",
                "src/main.rs",
                "src/models/mod.rs",
                "src/api/mod.rs",
                "src/utils/mod.rs",
            ],
        }),
    ))
}

async fn extract_api_definitions(input: StepInput) -> Result<StepOutput, StepError> {
    let examples = if flag(&input, "include_examples") {
        vec![CodeExample {
            title: "Basic Usage".to_string(),
            code: "let manager = WorkflowManager::new();\nmanager.start_workflow(\"test\").await?;"
                .to_string(),
            language: "rust".to_string(),
        }]
    } else {
        Vec::new()
    };

    let apis = vec![
        ApiDefinition {
            name: "WorkflowManager".to_string(),
            api_type: "struct".to_string(),
            signature: "pub struct WorkflowManager".to_string(),
            description: "Manages workflow execution and lifecycle".to_string(),
            parameters: Vec::new(),
            return_type: None,
            examples,
        },
        ApiDefinition {
            name: "start_workflow".to_string(),
            api_type: "function".to_string(),
            signature: "pub async fn start_workflow(&self, name: &str) -> Result<Workflow>"
                .to_string(),
            description: "Starts a new workflow with the given name".to_string(),
            parameters: vec![param("name", "&str", "Name of the workflow to start")],
            return_type: Some("Result<Workflow>".to_string()),
            examples: Vec::new(),
        },
        ApiDefinition {
            name: "stop_workflow".to_string(),
            api_type: "function".to_string(),
            signature: "pub fn stop_workflow(&mut self, id: WorkflowId)".to_string(),
            description: "Stops a running workflow".to_string(),
            parameters: vec![param("id", "WorkflowId", "ID of the workflow to stop")],
            return_type: None,
            examples: Vec::new(),
        },
    ];

    StepOutput::new()
        .with("total_apis", apis.len())
        .with("public_apis", apis.len())
        .with_json("api_definitions", &apis)
}

/// Markdown reference section for one API item.
pub fn api_markdown(api: &ApiDefinition) -> String {
    let mut md = String::new();
    let _ = write!(md, "## {}\n\n**Type**: {}\n\n", api.name, api.api_type);
    let _ = write!(md, "```rust\n{}\n```\n\n{}\n\n", api.signature, api.description);

    if !api.parameters.is_empty() {
        md.push_str("### Parameters\n\n");
        for p in &api.parameters {
            let _ = writeln!(md, "- **{}** (`{}`): {}", p.name, p.param_type, p.description);
        }
        md.push('\n');
    }
    if let Some(ret) = &api.return_type {
        let _ = write!(md, "### Returns\n\n`{}`\n\n", ret);
    }
    if !api.examples.is_empty() {
        md.push_str("### Examples\n\n");
        for ex in &api.examples {
            let _ = write!(md, "#### {}\n\n```{}\n{}\n```\n\n", ex.title, ex.language, ex.code);
        }
    }
    md
}

fn api_index(apis: &[ApiDefinition]) -> String {
    let mut md = String::from("# API Reference\n\n");
    let _ = write!(md, "This API provides {} public interfaces.\n\n## Index\n\n", apis.len());
    for api in apis {
        let _ = writeln!(md, "- [{}](#{}) - {}", api.name, api.name.to_lowercase(), api.api_type);
    }
    md
}

async fn generate_api_docs(input: StepInput) -> Result<StepOutput, StepError> {
    let apis: Vec<ApiDefinition> = input.result_as("api_definitions")?;

    let mut docs = Values::new();
    for api in &apis {
        docs.insert(
            api.name.clone(),
            json!({
                "name": api.name,
                "type": api.api_type,
                "signature": api.signature,
                "description": api.description,
                "markdown": api_markdown(api),
            }),
        );
    }

    Ok(StepOutput::new()
        .with("api_documentation", docs)
        .with("api_index", api_index(&apis))
        .with("doc_format", "markdown"))
}

async fn generate_readme(input: StepInput) -> Result<StepOutput, StepError> {
    let project = input.variable_str("project_name").unwrap_or("My Project");
    let with_examples = flag(&input, "include_examples");

    let mut sections = Values::new();
    sections.insert(
        "installation".to_string(),
        json!("## Installation\n\n```bash\ncargo build --release\n```"),
    );
    sections.insert(
        "usage".to_string(),
        json!(format!("## Usage\n\nRun `{}` with a configuration file.", project)),
    );
    if with_examples {
        sections.insert(
            "examples".to_string(),
            json!("## Examples\n\n```rust\nlet manager = WorkflowManager::new();\n```"),
        );
    }
    sections.insert(
        "contributing".to_string(),
        json!("## Contributing\n\nPull requests are welcome."),
    );
    sections.insert("license".to_string(), json!("## License\n\nMIT"));

    Ok(StepOutput::new()
        .with(
            "readme",
            json!({
                "title": project,
                "description": format!(
                    "{} is a workflow orchestration system for multi-agent coordination.",
                    project
                ),
                "sections": sections,
            }),
        )
        .with("readme_path", "README.md")
        .with("has_examples", with_examples))
}

async fn generate_architecture_docs(input: StepInput) -> Result<StepOutput, StepError> {
    if !flag(&input, "include_architecture") {
        return Ok(StepOutput::new().with("architecture_skipped", true));
    }

    let diagrams: Vec<&str> = if flag(&input, "include_diagrams") {
        vec!["architecture.png", "data-flow.png", "component-diagram.png"]
    } else {
        Vec::new()
    };

    Ok(StepOutput::new()
        .with(
            "architecture",
            json!({
                "overview": "Workflows are executed by agents that run ordered, retryable steps.",
                "components": [
                    {
                        "name": "Workflow Engine",
                        "responsibilities": ["Workflow lifecycle management", "Task scheduling", "State management"],
                    },
                    {
                        "name": "Agent System",
                        "responsibilities": ["Agent registration", "Workload distribution", "Result aggregation"],
                    },
                    {
                        "name": "Storage Layer",
                        "responsibilities": ["Workflow persistence", "Result storage", "Audit logging"],
                    },
                ],
                "data_flow": "request -> workflow -> agent steps -> result",
                "diagrams": diagrams,
            }),
        )
        .with("doc_path", "docs/ARCHITECTURE.md")
        .with("includes_diagrams", !diagrams.is_empty()))
}

async fn validate_documentation(input: StepInput) -> Result<StepOutput, StepError> {
    let mut issues = Vec::new();
    let mut section_scores = Values::new();

    for (section, score) in SECTIONS {
        if input.results.contains_key(section) {
            section_scores.insert(section.to_string(), json!(score));
        } else {
            issues.push(DocumentationIssue {
                severity: (if section == "architecture" { "warning" } else { "error" }).to_string(),
                location: section.to_string(),
                description: format!("{} not generated", section),
            });
        }
    }

    let completeness = section_scores.len() as f64 / SECTIONS.len() as f64;
    let examples_coverage = if get_bool(&input.results, "has_examples").unwrap_or(false) {
        0.8
    } else {
        0.0
    };
    let passed = issues.is_empty();
    let issue_count = issues.len();
    let issues = serde_json::to_value(&issues)?;

    Ok(StepOutput::new()
        .with(
            "quality_metrics",
            json!({
                "overall_score": BASELINE_CONFIDENCE * completeness,
                "quality_score": BASELINE_QUALITY * completeness,
                "completeness": completeness,
                "accuracy": 0.92,
                "readability": 0.85,
                "examples_coverage": examples_coverage,
                "sections": section_scores,
            }),
        )
        .with("issue_count", issue_count)
        .with("validation_results", json!({ "passed": passed, "issues": issues })))
}

/// Scores reported by `validate_documentation`.
pub fn score_documentation(results: &Values) -> Scores {
    let metrics = results
        .get("quality_metrics")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    Scores::new(
        get_f64(&metrics, "overall_score").unwrap_or(0.0),
        get_f64(&metrics, "quality_score").unwrap_or(0.0),
    )
}

pub fn documentation_agent(id: &str) -> StepAgentBuilder {
    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    StepAgent::builder(id, AGENT_TYPE_DOCUMENTATION, ResultKind::Documentation)
        .capabilities([
            "api_documentation",
            "readme_generation",
            "architecture_docs",
            "code_comments",
            "diagram_generation",
        ])
        .steps([
            Step::from_fn("analyze_codebase", "Scan the codebase structure", |_ctx, input| {
                analyze_codebase(input)
            })
            .with_timeout(minutes(5))
            .with_retries(1),
            Step::from_fn(
                "extract_api_definitions",
                "Collect public API definitions",
                |_ctx, input| extract_api_definitions(input),
            )
            .with_timeout(minutes(8))
            .with_retries(1),
            Step::from_fn("generate_api_docs", "Write the API reference", |_ctx, input| {
                generate_api_docs(input)
            })
            .with_timeout(minutes(10))
            .with_retries(1),
            Step::from_fn("generate_readme", "Write the README", |_ctx, input| {
                generate_readme(input)
            })
            .with_timeout(minutes(5))
            .with_retries(1),
            Step::from_fn(
                "generate_architecture_docs",
                "Describe the architecture",
                |_ctx, input| generate_architecture_docs(input),
            )
            .with_timeout(minutes(7))
            .with_retries(1),
            Step::from_fn(
                "validate_documentation",
                "Check documentation completeness",
                |_ctx, input| validate_documentation(input),
            )
            .with_timeout(minutes(5))
            .with_retries(1),
        ])
        .scorer(score_documentation)
        .artifacts([
            "README.md",
            "docs/API.md",
            "docs/ARCHITECTURE.md",
            "docs/api/index.md",
        ])
        .timeout(minutes(30))
}
