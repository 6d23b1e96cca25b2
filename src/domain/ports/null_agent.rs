//! Null agent implementation.
//!
//! Used to run the orchestrator without a real agent backend — tests,
//! dry-run evaluation of the command surface, or a project with no agent
//! configured for a given [`AgentType`] yet.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::errors::OrchardResult;
use crate::domain::models::{AgentResult, Task, TddState};
use super::Agent;

/// An agent that always succeeds instantly and produces no output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAgent;

impl NullAgent {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Agent for NullAgent {
    fn name(&self) -> &str {
        "null"
    }

    fn capabilities(&self) -> HashSet<String> {
        HashSet::new()
    }

    async fn run(&self, task: &Task, dry_run: bool) -> OrchardResult<AgentResult> {
        Ok(AgentResult {
            ok: true,
            output: format!("null agent accepted {} (dry_run={dry_run})", task.command),
            error: None,
            artifacts: std::collections::HashMap::new(),
            execution_time_ms: 0,
        })
    }

    async fn execute_tdd_phase(&self, phase: TddState, task: &Task) -> OrchardResult<AgentResult> {
        Ok(AgentResult {
            ok: true,
            output: format!("null agent executed {phase} phase for task {}", task.id),
            error: None,
            artifacts: std::collections::HashMap::new(),
            execution_time_ms: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentType;

    #[tokio::test]
    async fn null_agent_always_succeeds() {
        let agent = NullAgent::new();
        let task = Task::new(AgentType::Code, "noop");
        let result = agent.run(&task, true).await.unwrap();
        assert!(result.ok);
    }
}
