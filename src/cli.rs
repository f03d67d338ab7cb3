//! CLI definitions for Sagaflow.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sagaflow CLI.
#[derive(Parser)]
#[command(name = "sagaflow")]
#[command(about = "Saga-style multi-step workflow orchestration for pluggable agents")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true, env = "SAGAFLOW_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start a workflow from a template and run it to completion
    Run {
        /// Template ID
        #[arg(short, long)]
        template: String,

        /// Variable override, repeatable (values are parsed as JSON when possible)
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Run a single step of a stored workflow
    Step {
        /// Workflow ID
        #[arg(short, long)]
        workflow: String,

        /// Step number, starting at 1
        #[arg(short, long)]
        step: usize,
    },

    /// List workflow templates
    Templates {
        /// Only templates for this agent type
        #[arg(long)]
        agent_type: Option<String>,
    },

    /// List registered agent types
    Agents,

    /// Show the progress of a workflow
    Progress {
        /// Workflow ID
        workflow_id: String,
    },
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
