//! Human-in-the-loop approval requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Task;

/// A persisted record that a human operator must acknowledge before a gated
/// task proceeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: Uuid,
    pub project_name: String,
    pub task: Task,
    /// Why this task is waiting on a human: `"blocking_policy"`,
    /// `"human_intervention"` (failure-recovery escalation), etc.
    pub reason: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
}

impl ApprovalRequest {
    pub fn new(project_name: impl Into<String>, task: Task, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_name: project_name.into(),
            task,
            reason: reason.into(),
            created_at: Utc::now(),
            retry_count: 0,
        }
    }

    pub fn is_human_intervention(&self) -> bool {
        self.reason.contains("human_intervention")
    }
}
