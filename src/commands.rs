//! Command handlers.

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sagaflow_protocols::Values;

use crate::bootstrap::App;

/// Token cancelled on Ctrl-C.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}

/// `--var` values are JSON when they parse as JSON, plain strings otherwise.
pub(crate) fn overrides(vars: Vec<(String, String)>) -> Values {
    vars.into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            (key, value)
        })
        .collect()
}

pub(crate) async fn run(app: &App, template: &str, vars: Vec<(String, String)>) -> anyhow::Result<()> {
    let request = app.templates.apply_template(template, &overrides(vars))?;
    let workflow = app.executor.start_workflow(request).await?;
    info!("Running workflow {} from template '{}'", workflow.id, template);

    let result = app
        .executor
        .execute_workflow(&workflow.id, interrupt_token())
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub(crate) async fn step(app: &App, workflow_id: &str, step: usize) -> anyhow::Result<()> {
    let output = app
        .executor
        .execute_workflow_step(workflow_id, step, interrupt_token())
        .await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    let progress = app.executor.get_workflow_progress(workflow_id).await?;
    info!(
        "Workflow {} at step {}/{} ({:.0}%)",
        workflow_id, progress.current_step, progress.total_steps, progress.progress_percent
    );
    Ok(())
}

pub(crate) fn templates(app: &App, agent_type: Option<&str>) {
    let templates = app.templates.list_templates(agent_type.unwrap_or_default());
    if templates.is_empty() {
        println!("No templates found.");
        return;
    }
    for template in templates {
        println!(
            "{:<24} {:<14} {} ({} steps)",
            template.id,
            template.agent_type,
            template.name,
            template.steps.len()
        );
    }
}

pub(crate) fn agents(app: &App) {
    for agent_type in app.executor.registry().list_types() {
        println!("{}", agent_type);
    }
}

pub(crate) async fn progress(app: &App, workflow_id: &str) -> anyhow::Result<()> {
    let progress = app.executor.get_workflow_progress(workflow_id).await?;
    println!("{}", serde_json::to_string_pretty(&progress)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overrides_parse_json_values() {
        let values = overrides(vec![
            ("benchmarks".to_string(), "false".to_string()),
            ("failing_tests".to_string(), "0".to_string()),
            ("language".to_string(), "go".to_string()),
            ("metrics".to_string(), r#"{"secrets_found": 1}"#.to_string()),
        ]);

        assert_eq!(values["benchmarks"], json!(false));
        assert_eq!(values["failing_tests"], json!(0));
        assert_eq!(values["language"], json!("go"));
        assert_eq!(values["metrics"]["secrets_found"], 1);
    }
}
