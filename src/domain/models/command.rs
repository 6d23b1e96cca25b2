//! Typed command surface dispatched to [`crate::services::orchestrator`].
//!
//! The external interface is plain strings over a CLI/IPC
//! boundary, but parsing happens once at the edge (`parse_command`) and
//! everything downstream matches on this tagged enum rather than
//! re-inspecting strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BacklogKind {
    Product,
    Sprint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Epic {
        title: Option<String>,
        description: String,
    },
    BacklogView {
        backlog_type: BacklogKind,
    },
    BacklogAddStory {
        title: Option<String>,
        description: String,
        epic_id: Option<Uuid>,
        priority: u8,
    },
    BacklogPrioritize {
        story_id: Uuid,
        priority: u8,
    },
    SprintPlan {
        story_ids: Vec<Uuid>,
    },
    SprintStart,
    SprintStatus,
    SprintPause,
    SprintResume,
    Approve {
        item_ids: Option<Vec<Uuid>>,
    },
    RequestChanges {
        description: String,
    },
    SuggestFix {
        description: String,
    },
    SkipTask,
    Feedback {
        description: String,
    },
    State,
    TddStart {
        story_id: Uuid,
        task_description: Option<String>,
    },
    TddStatus {
        story_id: Option<Uuid>,
    },
    TddNext {
        story_id: Option<Uuid>,
    },
    TddDesign {
        story_id: Option<Uuid>,
    },
    TddTest {
        story_id: Option<Uuid>,
    },
    TddCode {
        story_id: Option<Uuid>,
    },
    TddRefactor {
        story_id: Option<Uuid>,
    },
    TddCommit {
        story_id: Option<Uuid>,
    },
    TddRunTests {
        story_id: Option<Uuid>,
    },
    TddAbort {
        story_id: Option<Uuid>,
    },
    TddLogs,
    TddOverview,
}

impl Command {
    /// Commands beginning with `/tdd` or `/state` bypass ScrumFSM validation.
    pub const fn bypasses_scrum_validation(&self) -> bool {
        matches!(
            self,
            Self::State
                | Self::TddStart { .. }
                | Self::TddStatus { .. }
                | Self::TddNext { .. }
                | Self::TddDesign { .. }
                | Self::TddTest { .. }
                | Self::TddCode { .. }
                | Self::TddRefactor { .. }
                | Self::TddCommit { .. }
                | Self::TddRunTests { .. }
                | Self::TddAbort { .. }
                | Self::TddLogs
                | Self::TddOverview
        )
    }

    /// The explicit `story_id` carried by the TDD-advance commands, if the
    /// caller named one. `None` for every other variant, including the
    /// cycle-scoped commands that don't take a story at all.
    pub const fn tdd_story_id(&self) -> Option<Uuid> {
        match self {
            Self::TddNext { story_id }
            | Self::TddDesign { story_id }
            | Self::TddTest { story_id }
            | Self::TddCode { story_id }
            | Self::TddRefactor { story_id }
            | Self::TddCommit { story_id }
            | Self::TddRunTests { story_id } => *story_id,
            _ => None,
        }
    }
}

/// Uniform result envelope returned by every command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResult {
    pub ok: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub hint: Option<String>,
    pub current_state: Option<String>,
    pub allowed_commands: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl CommandResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn err(error: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            hint,
            ..Default::default()
        }
    }

    pub fn with_payload(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.payload.insert(key.to_string(), v);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tdd_and_state_commands_bypass_scrum_validation() {
        assert!(Command::State.bypasses_scrum_validation());
        assert!(Command::TddNext { story_id: None }.bypasses_scrum_validation());
        assert!(!Command::SprintStart.bypasses_scrum_validation());
    }

    #[test]
    fn err_result_carries_hint_and_not_ok() {
        let result = CommandResult::err("no such project", Some("try /state".to_string()));
        assert!(!result.ok);
        assert_eq!(result.hint.as_deref(), Some("try /state"));
    }
}
