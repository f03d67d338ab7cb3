//! Sagaflow - saga-style workflow orchestration
//!
//! Main entry point for the Sagaflow CLI.

mod bootstrap;
mod cli;
mod commands;

use std::sync::OnceLock;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sagaflow_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};

use crate::bootstrap::App;
use crate::cli::{Cli, Commands};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize tracing with console output and, when enabled, a daily log file.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = if logging.file {
        let log_dir = ConfigLoader::expand_path(&logging.dir);
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("sagaflow")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        Some(fmt::layer().json().with_writer(non_blocking))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

/// Log validation warnings; validation errors abort startup.
fn validate_config(config: &Config) -> anyhow::Result<()> {
    for warning in ConfigValidator::validate(config).into_result()? {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(&cli.config)?;
    init_tracing(&config.logging)?;
    validate_config(&config)?;

    info!("Starting Sagaflow v{}", env!("CARGO_PKG_VERSION"));
    let app = App::build(&config).await?;

    match cli.command {
        Commands::Run { template, vars } => commands::run(&app, &template, vars).await,
        Commands::Step { workflow, step } => commands::step(&app, &workflow, step).await,
        Commands::Templates { agent_type } => {
            commands::templates(&app, agent_type.as_deref());
            Ok(())
        }
        Commands::Agents => {
            commands::agents(&app);
            Ok(())
        }
        Commands::Progress { workflow_id } => commands::progress(&app, &workflow_id).await,
    }
}
