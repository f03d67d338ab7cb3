//! Assembly of registry, store, strategy, templates and executor from config.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sagaflow_agents::register_builtin_agents_with;
use sagaflow_checkpoint::{CheckpointEngine, CheckpointManager, RecoveryManager, open_store};
use sagaflow_config::{Config, ConfigLoader, ExecutionMode, StoreBackend};
use sagaflow_core::{AgentRegistry, RetryPolicy, StepExecutor, TemplateManager};
use sagaflow_protocols::{WorkflowHandle, WorkflowStore};
use sagaflow_runtime::{DirectStrategy, DurableStrategy, ExecutionStrategy, WorkflowExecutor};
use sagaflow_store::{MemoryWorkflowStore, SqliteWorkflowStore};

/// Everything a command needs.
pub(crate) struct App {
    pub executor: WorkflowExecutor,
    pub templates: TemplateManager,
}

/// Step executor configured by `[executor]`.
pub(crate) fn step_executor(config: &Config) -> StepExecutor {
    let policy = RetryPolicy::fixed(Duration::from_millis(config.executor.retry_delay_ms))
        .with_jitter(config.executor.retry_jitter);
    let executor = StepExecutor::new(policy);
    match config.executor.default_step_timeout_secs {
        Some(secs) => executor.with_default_timeout(Duration::from_secs(secs)),
        None => executor,
    }
}

pub(crate) fn registry(config: &Config) -> Arc<AgentRegistry> {
    let registry = AgentRegistry::new();
    register_builtin_agents_with(&registry, step_executor(config));
    info!("Registered {} agent types", registry.len());
    Arc::new(registry)
}

pub(crate) async fn store(config: &Config) -> anyhow::Result<Arc<dyn WorkflowStore>> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryWorkflowStore::new())),
        StoreBackend::Sqlite => {
            let path = ConfigLoader::expand_path(&config.store.path);
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!("Opening workflow store at {}", path);
            Ok(Arc::new(SqliteWorkflowStore::open(&path).await?))
        }
    }
}

pub(crate) fn templates(config: &Config) -> anyhow::Result<TemplateManager> {
    let templates = if config.templates.builtin {
        TemplateManager::with_builtin_templates()
    } else {
        TemplateManager::new()
    };
    for file in &config.templates.files {
        templates.load_file(ConfigLoader::expand_path(file))?;
    }
    Ok(templates)
}

/// Durable strategy over the configured checkpoint store, plus handles of
/// the interrupted runs it resumed.
async fn durable_strategy(
    config: &Config,
    registry: Arc<AgentRegistry>,
) -> anyhow::Result<(Arc<dyn ExecutionStrategy>, Vec<WorkflowHandle>)> {
    let checkpoints = open_store(&config.checkpoint).await?;
    let manager = Arc::new(CheckpointManager::from_config(&config.checkpoint, checkpoints));
    let engine = Arc::new(CheckpointEngine::new(manager.clone()));
    let strategy = DurableStrategy::new(engine.clone(), registry)?;

    let recovery = RecoveryManager::from_config(&config.checkpoint, manager);
    let handles = recovery
        .resume_interrupted(engine.as_ref(), &CancellationToken::new())
        .await?;
    if !handles.is_empty() {
        info!("Resuming {} interrupted runs", handles.len());
    }
    Ok((Arc::new(strategy), handles))
}

/// Wait for resumed runs and record their outcome in the workflow store.
async fn finish_resumed(executor: &WorkflowExecutor, handles: Vec<WorkflowHandle>) {
    for handle in handles {
        let run_id = handle.run_id().to_string();
        if let Err(e) = executor.finish_resumed(handle).await {
            warn!("Resumed run '{}' not completed: {}", run_id, e);
        }
    }
}

impl App {
    pub(crate) async fn build(config: &Config) -> anyhow::Result<Self> {
        let registry = registry(config);
        let store = store(config).await?;

        let (strategy, resumed) = match config.executor.mode {
            ExecutionMode::Direct => {
                let direct: Arc<dyn ExecutionStrategy> = Arc::new(DirectStrategy);
                (direct, Vec::new())
            }
            ExecutionMode::Durable => durable_strategy(config, registry.clone()).await?,
        };

        let executor = WorkflowExecutor::new(registry, store, strategy)
            .with_step_executor(step_executor(config));
        info!("Workflow executor ready ({} strategy)", executor.strategy_name());
        finish_resumed(&executor, resumed).await;

        Ok(Self {
            executor,
            templates: templates(config)?,
        })
    }
}
