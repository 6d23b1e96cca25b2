//! Agent capability port.
//!
//! An agent is any object satisfying a small capability set. All agents are
//! assumed single-threaded with respect to a given [`Task`] unless they
//! declare `reentrant()`; the scheduler/orchestrator must respect that.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::domain::errors::OrchardResult;
use crate::domain::models::{AgentResult, Task, TddState};

#[async_trait]
pub trait Agent: Send + Sync {
    /// Stable identifier used in logs and hand-off records.
    fn name(&self) -> &str;

    /// Advertised capability tags, e.g. `feature_implementation`,
    /// `tdd_specification`, `data_quality`.
    fn capabilities(&self) -> HashSet<String>;

    /// Whether the scheduler may dispatch two tasks to this agent
    /// concurrently. Defaults to `false`.
    fn reentrant(&self) -> bool {
        false
    }

    async fn run(&self, task: &Task, dry_run: bool) -> OrchardResult<AgentResult>;

    /// Executes one TDD phase directly, for agents wired into the
    /// orchestrator's TDD hand-off table.
    async fn execute_tdd_phase(&self, phase: TddState, task: &Task) -> OrchardResult<AgentResult>;
}
