//! Template catalog.
//!
//! Templates carry default variables and a step outline for one agent
//! type. Applying a template merges caller overrides over its defaults and
//! yields a [`StartWorkflowRequest`].

mod builtin;

pub use builtin::builtin_templates;

use std::path::Path;

use dashmap::DashMap;
use tracing::{debug, info};

use sagaflow_protocols::{StartWorkflowRequest, TemplateError, Values, WorkflowTemplate, merge_values};

/// Priority given to workflows started from a template.
pub const DEFAULT_PRIORITY: i32 = 2;

/// Thread-safe template catalog.
#[derive(Debug, Default)]
pub struct TemplateManager {
    templates: DashMap<String, WorkflowTemplate>,
}

impl TemplateManager {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog holding the built-in templates.
    pub fn with_builtin_templates() -> Self {
        let manager = Self::new();
        for template in builtin_templates() {
            manager.templates.insert(template.id.clone(), template);
        }
        manager
    }

    pub fn get_template(&self, id: &str) -> Result<WorkflowTemplate, TemplateError> {
        self.templates
            .get(id)
            .map(|t| t.value().clone())
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))
    }

    /// Templates for `agent_type`, or every template when it is empty.
    /// Sorted by id.
    pub fn list_templates(&self, agent_type: &str) -> Vec<WorkflowTemplate> {
        let mut templates: Vec<_> = self
            .templates
            .iter()
            .filter(|t| agent_type.is_empty() || t.agent_type == agent_type)
            .map(|t| t.value().clone())
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Store a template, replacing any template with the same id.
    pub fn register_template(&self, template: WorkflowTemplate) -> Result<(), TemplateError> {
        if template.id.is_empty() {
            return Err(TemplateError::MissingId);
        }
        debug!("Registering template: {}", template.id);
        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    /// Build a start request from a template.
    ///
    /// Override values win over template defaults; neither map is modified.
    pub fn apply_template(
        &self,
        id: &str,
        overrides: &Values,
    ) -> Result<StartWorkflowRequest, TemplateError> {
        let template = self.get_template(id)?;

        let mut variables = template.variables.clone();
        merge_values(&mut variables, overrides);

        Ok(StartWorkflowRequest {
            title: template.name,
            workflow_type: template.agent_type.clone(),
            agent_type: template.agent_type,
            priority: DEFAULT_PRIORITY,
            variables,
            template_id: Some(template.id),
        })
    }

    /// Register a template read from a JSON file. Returns its id.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<String, TemplateError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let template = WorkflowTemplate::from_json(&data)?;
        let id = template.id.clone();
        self.register_template(template)?;
        info!("Loaded template '{}' from {}", id, path.display());
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
