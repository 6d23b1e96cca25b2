//! Scrum-side entities: epics, stories, sprints, and the project container.
//!
//! The state machine itself lives in [`crate::services::scrum_fsm`]; this
//! module holds the data the machine validates transitions over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Per-project execution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationPolicy {
    /// Agent tasks wait in the approval queue until a human approves.
    Blocking,
    /// Agent tasks run in dry-run mode; output is advisory/quarantined.
    Partial,
    /// Agent tasks execute live.
    Autonomous,
}

impl Default for OrchestrationPolicy {
    fn default() -> Self {
        Self::Blocking
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpicStatus {
    Draft,
    Active,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Epic {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: EpicStatus,
}

impl Epic {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            status: EpicStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryStatus {
    Backlog,
    InSprint,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub epic_id: Option<Uuid>,
    /// 1 = highest priority, 5 = lowest.
    pub priority: u8,
    pub status: StoryStatus,
    pub tdd_cycle_id: Option<Uuid>,
    /// Mirrors the owning TDD cycle's current state as a string, or `None`
    /// if no cycle has ever been started for this story.
    pub test_status: Option<String>,
}

impl Story {
    pub fn new(title: impl Into<String>, description: impl Into<String>, priority: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: description.into(),
            epic_id: None,
            priority: priority.clamp(1, 5),
            status: StoryStatus::Backlog,
            tdd_cycle_id: None,
            test_status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    Planned,
    Active,
    Review,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: Uuid,
    pub goal: String,
    pub story_ids: Vec<Uuid>,
    pub status: SprintStatus,
}

impl Sprint {
    pub fn new(goal: impl Into<String>, story_ids: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal: goal.into(),
            story_ids,
            status: SprintStatus::Planned,
        }
    }
}

/// The high-level Scrum lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrumState {
    Idle,
    BacklogReady,
    SprintPlanned,
    SprintActive,
    SprintPaused,
    SprintReview,
    Blocked,
}

impl Default for ScrumState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for ScrumState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "IDLE",
            Self::BacklogReady => "BACKLOG_READY",
            Self::SprintPlanned => "SPRINT_PLANNED",
            Self::SprintActive => "SPRINT_ACTIVE",
            Self::SprintPaused => "SPRINT_PAUSED",
            Self::SprintReview => "SPRINT_REVIEW",
            Self::Blocked => "BLOCKED",
        };
        write!(f, "{s}")
    }
}

/// A project: one Scrum lifecycle plus a TDD cycle per in-progress story.
///
/// Owned exclusively by the [`crate::services::orchestrator::Orchestrator`];
/// it in turn exclusively owns its FSM state and active-task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub root_path: std::path::PathBuf,
    pub orchestration_policy: OrchestrationPolicy,
    pub scrum_state: ScrumState,
    pub epics: Vec<Epic>,
    pub stories: Vec<Story>,
    pub sprints: Vec<Sprint>,
    /// `story_id -> TDDCycle`, stored separately in
    /// [`crate::services::tdd_fsm`]/[`crate::domain::models::tdd`]; this map
    /// only tracks which stories currently own a non-terminal cycle.
    pub active_tdd_cycles: HashMap<Uuid, Uuid>,
    pub active_task_ids: Vec<Uuid>,
    pub pending_approval_ids: Vec<Uuid>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, root_path: std::path::PathBuf, policy: OrchestrationPolicy) -> Self {
        Self {
            name: name.into(),
            root_path,
            orchestration_policy: policy,
            scrum_state: ScrumState::Idle,
            epics: Vec::new(),
            stories: Vec::new(),
            sprints: Vec::new(),
            active_tdd_cycles: HashMap::new(),
            active_task_ids: Vec::new(),
            pending_approval_ids: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn active_sprint(&self) -> Option<&Sprint> {
        self.sprints.iter().find(|s| s.status == SprintStatus::Active)
    }

    pub fn story_mut(&mut self, id: Uuid) -> Option<&mut Story> {
        self.stories.iter_mut().find(|s| s.id == id)
    }

    pub fn story(&self, id: Uuid) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
