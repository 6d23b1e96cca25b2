//! Error taxonomy for the orchestration engine.
//!
//! Errors are classified, not thrown ad hoc: `CommandValidation`
//! surfaces to the user with a hint and the allowed-commands list;
//! `StoragePersistence` is retried with backoff before a project is marked
//! `Blocked`; `AgentExecution` carries a failure-recovery kind; background
//! task failures are counted and retried up to their own budget;
//! `ResourceExhaustion` is surfaced, never silently dropped.

use thiserror::Error;
use uuid::Uuid;

/// The class of failure that occurred while running an agent task.
///
/// Drives the failure-recovery table in [`crate::services::orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentFailureKind {
    /// The test suite did not pass after the agent's change.
    TestFailure,
    /// The project failed to build.
    BuildFailure,
    /// The agent call exceeded its timeout.
    Timeout,
    /// The agent capability itself raised an error (crash, malformed output).
    AgentError,
}

impl AgentFailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TestFailure => "test_failure",
            Self::BuildFailure => "build_failure",
            Self::Timeout => "timeout",
            Self::AgentError => "agent_error",
        }
    }
}

/// Top-level error type returned by orchestration engine APIs.
#[derive(Debug, Error)]
pub enum OrchardError {
    /// A command failed FSM validation. Carries the human-readable hint and
    /// the commands allowed from the current state so the caller can recover
    /// without guessing.
    #[error("command validation failed: {hint}")]
    CommandValidation {
        hint: String,
        allowed_commands: Vec<String>,
    },

    /// Persisting a project snapshot or index failed.
    #[error("storage persistence failed: {0}")]
    StoragePersistence(String),

    /// An agent task failed during execution.
    #[error("agent execution failed ({kind:?}): {message}")]
    AgentExecution {
        kind: AgentFailureKind,
        message: String,
    },

    /// A background task handler raised an error.
    #[error("background task error: {0}")]
    ContextBackgroundError(String),

    /// A resource limit was hit (full queue, too many concurrent TDD cycles,
    /// oversized file).
    #[error("resource exhausted: {0}")]
    ResourceExhaustion(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("story not found: {0}")]
    StoryNotFound(Uuid),

    #[error("tdd cycle not found for story: {0}")]
    TddCycleNotFound(Uuid),

    #[error("approval request not found: {0}")]
    ApprovalNotFound(Uuid),

    /// A stored row failed to parse back into a domain type (corrupt UUID,
    /// timestamp, or JSON column).
    #[error("row parse error: {0}")]
    RowParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type OrchardResult<T> = Result<T, OrchardError>;
