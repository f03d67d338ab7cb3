//! Workflow template definitions.

use serde::{Deserialize, Serialize};

use super::Values;
use crate::error::TemplateError;

/// A step entry of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStep {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Per-step timeout in seconds.
    #[serde(default = "default_step_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub parameters: Values,
}

fn default_step_timeout_secs() -> u64 {
    300
}

impl TemplateStep {
    pub fn new(name: impl Into<String>, description: impl Into<String>, timeout_secs: u64, retry_count: u32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            timeout_secs,
            retry_count,
            parameters: Values::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// Default execution settings of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Overall timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub continue_on_error: bool,
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    1800
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            continue_on_error: false,
        }
    }
}

/// A named, reusable workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub agent_type: String,
    #[serde(default)]
    pub steps: Vec<TemplateStep>,
    /// Default variables, overridable when the template is applied.
    #[serde(default)]
    pub variables: Values,
    #[serde(default)]
    pub config: TemplateConfig,
}

impl WorkflowTemplate {
    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, TemplateError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_template_json_round_trip() {
        let mut variables = Values::new();
        variables.insert("focus".to_string(), json!("general"));
        let template = WorkflowTemplate {
            id: "research-basic".to_string(),
            name: "Basic Research".to_string(),
            description: "Standard library research workflow".to_string(),
            agent_type: "research".to_string(),
            steps: vec![TemplateStep::new("library_discovery", "Discover libraries", 300, 2)],
            variables,
            config: TemplateConfig::default(),
        };

        let json = template.to_json().unwrap();
        let back = WorkflowTemplate::from_json(&json).unwrap();
        assert_eq!(back, template);
    }

    #[test]
    fn test_template_from_minimal_json() {
        let template = WorkflowTemplate::from_json(
            r#"{"id": "custom", "name": "Custom", "agent_type": "poc"}"#,
        )
        .unwrap();
        assert!(template.steps.is_empty());
        assert_eq!(template.config.max_retries, 3);
        assert!(!template.config.continue_on_error);
    }

    #[test]
    fn test_template_from_invalid_json() {
        let err = WorkflowTemplate::from_json("{not json").unwrap_err();
        assert!(matches!(err, TemplateError::Serialization(_)));
    }

    #[test]
    fn test_step_parameter_builder() {
        let step = TemplateStep::new("static_analysis", "Analyze", 600, 1)
            .with_parameter("criteria", json!(["performance", "benchmarks"]));
        assert_eq!(step.parameters["criteria"], json!(["performance", "benchmarks"]));
    }
}
