//! # Sagaflow Agents
//!
//! Built-in agent variants for the Sagaflow framework.
//!
//! Every variant is a [`StepAgent`] assembled from simulated, deterministic
//! step bodies:
//!
//! - [`research`] - library discovery and findings synthesis
//! - [`poc`] - proof-of-concept build with saga rollback
//! - [`documentation`] - API, README and architecture docs
//! - [`validation`] - weighted checklist validation

pub mod research;
pub mod poc;
pub mod documentation;
pub mod validation;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::debug;

use sagaflow_core::{AgentRegistry, StepAgent, StepAgentBuilder, StepExecutor};
use sagaflow_protocols::{
    AGENT_TYPE_DOCUMENTATION, AGENT_TYPE_POC, AGENT_TYPE_RESEARCH, AGENT_TYPE_VALIDATION, Agent,
};

pub use documentation::documentation_agent;
pub use poc::{poc_agent, poc_compensations};
pub use research::research_agent;
pub use validation::validation_agent;

/// Type tags of the built-in agents.
pub const BUILTIN_AGENT_TYPES: [&str; 4] = [
    AGENT_TYPE_RESEARCH,
    AGENT_TYPE_POC,
    AGENT_TYPE_DOCUMENTATION,
    AGENT_TYPE_VALIDATION,
];

/// Register the four built-in agent types with default step execution.
pub fn register_builtin_agents(registry: &AgentRegistry) {
    register_builtin_agents_with(registry, StepExecutor::default());
}

/// Register the built-in agent types; every agent runs its steps with
/// `executor`.
pub fn register_builtin_agents_with(registry: &AgentRegistry, executor: StepExecutor) {
    register(registry, AGENT_TYPE_RESEARCH, research_agent, &executor);
    register(registry, AGENT_TYPE_POC, poc_agent, &executor);
    register(registry, AGENT_TYPE_DOCUMENTATION, documentation_agent, &executor);
    register(registry, AGENT_TYPE_VALIDATION, validation_agent, &executor);
    debug!("Registered {} built-in agent types", BUILTIN_AGENT_TYPES.len());
}

fn register(
    registry: &AgentRegistry,
    agent_type: &str,
    builder: fn(&str) -> StepAgentBuilder,
    executor: &StepExecutor,
) {
    let executor = executor.clone();
    registry.register(agent_type, move |id: &str| -> Arc<dyn Agent> {
        Arc::new(builder(id).executor(executor.clone()).build())
    });
}

/// Build a built-in agent directly, without a registry.
pub fn builtin_agent(agent_type: &str, id: &str) -> Option<StepAgent> {
    let builder = match agent_type {
        AGENT_TYPE_RESEARCH => research_agent(id),
        AGENT_TYPE_POC => poc_agent(id),
        AGENT_TYPE_DOCUMENTATION => documentation_agent(id),
        AGENT_TYPE_VALIDATION => validation_agent(id),
        _ => return None,
    };
    Some(builder.build())
}
