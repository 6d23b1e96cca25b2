//! TDD cycle entities: the per-story red/green/refactor state machine data.
//!
//! The transition rules live in [`crate::services::tdd_fsm`]; this module
//! holds the cycle record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// TDD cycle state. Transitions are linear except for the
/// `REFACTOR -> TEST_RED` loop-back when refactoring breaks a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TddState {
    Design,
    TestRed,
    CodeGreen,
    Refactor,
    Commit,
}

impl TddState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Design => "DESIGN",
            Self::TestRed => "TEST_RED",
            Self::CodeGreen => "CODE_GREEN",
            Self::Refactor => "REFACTOR",
            Self::Commit => "COMMIT",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Commit)
    }
}

impl std::fmt::Display for TddState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single TDD task dispatched to an agent for one phase of a cycle. Kept
/// distinct from [`crate::domain::models::task::Task`] so the orchestrator
/// can log phase history without entangling it with the generic agent task
/// queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TDDTask {
    pub id: Uuid,
    pub phase: TddState,
    pub task_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub passed: Option<bool>,
}

impl TDDTask {
    pub fn new(phase: TddState, task_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase,
            task_id,
            started_at: Utc::now(),
            completed_at: None,
            passed: None,
        }
    }
}

/// The full TDD cycle for a single story.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TDDCycle {
    pub id: Uuid,
    pub story_id: Uuid,
    pub state: TddState,
    pub history: Vec<TDDTask>,
    /// Number of times `REFACTOR -> TEST_RED` has looped back for this
    /// cycle; the orchestrator escalates to human intervention past a
    /// configured bound.
    pub refactor_regressions: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TDDCycle {
    pub fn new(story_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            story_id,
            state: TddState::Design,
            history: Vec::new(),
            refactor_regressions: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn record(&mut self, task: TDDTask) {
        self.history.push(task);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cycle_starts_in_design_with_empty_history() {
        let cycle = TDDCycle::new(Uuid::new_v4());
        assert_eq!(cycle.state, TddState::Design);
        assert!(cycle.history.is_empty());
        assert_eq!(cycle.refactor_regressions, 0);
    }

    #[test]
    fn only_commit_is_terminal() {
        assert!(TddState::Commit.is_terminal());
        assert!(!TddState::Design.is_terminal());
        assert!(!TddState::Refactor.is_terminal());
    }
}
