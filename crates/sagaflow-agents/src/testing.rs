//! Helpers shared by the agent tests.

use std::time::Duration;

use serde_json::Value;

use sagaflow_core::{RetryPolicy, StepAgent, StepAgentBuilder, StepExecutor};
use sagaflow_protocols::{Agent, AgentError, AgentResult, CancellationToken, Values, Workflow};

pub fn vars<const N: usize>(pairs: [(&str, Value); N]) -> Values {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Build with a retry policy that does not sleep.
pub fn build(builder: StepAgentBuilder) -> StepAgent {
    builder
        .executor(StepExecutor::new(RetryPolicy::fixed(Duration::ZERO)))
        .build()
}

pub async fn run(agent: &StepAgent, variables: Values) -> Result<AgentResult, AgentError> {
    let workflow = Workflow::new("wf-test", agent.agent_type(), agent.id(), variables);
    agent.execute(&workflow, CancellationToken::new()).await
}
