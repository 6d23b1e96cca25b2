//! Agent task: the unit of work the orchestrator hands to an agent.
//!
//! Distinct from [`crate::domain::models::background_task::BackgroundTask`],
//! which is maintenance work run by the scheduler's worker pool rather than
//! an agent capability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle status of an agent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Which kind of agent a task is destined for.
///
/// The orchestrator's TDD hand-off table maps each TDD state to
/// one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentType {
    Design,
    Qa,
    Code,
    Data,
}

impl AgentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Qa => "qa",
            Self::Code => "code",
            Self::Data => "data",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An agent task: an opaque command plus free-form context, dispatched to a
/// single agent type under the project's orchestration policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub agent_type: AgentType,
    /// Opaque command string the agent interprets (e.g. a TDD phase
    /// instruction or an epic-decomposition request).
    pub command: String,
    /// Free-form context passed to the agent: story id, cycle id, test
    /// files, source files, and anything else the hand-off carries.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
    pub status: TaskStatus,
    #[serde(default)]
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(agent_type: AgentType, command: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_type,
            command: command.into(),
            context: HashMap::new(),
            status: TaskStatus::Pending,
            retry_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.to_string(), v);
        }
        self
    }
}

/// Result returned by an agent for a single task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub ok: bool,
    pub output: String,
    pub error: Option<String>,
    #[serde(default)]
    pub artifacts: HashMap<String, String>,
    pub execution_time_ms: u64,
}
