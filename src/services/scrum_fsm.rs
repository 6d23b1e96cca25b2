//! Project-lifecycle state machine.
//!
//! Pure validation: no mutation, no I/O. The orchestrator calls
//! [`ScrumFsm::validate`] before executing a command body, then applies the
//! returned state on success.

use crate::domain::models::{BacklogKind, Command, ScrumState};

/// Outcome of validating a command against the current [`ScrumState`].
#[derive(Debug, Clone)]
pub enum ScrumValidation {
    Ok { new_state: Option<ScrumState> },
    Err { hint: String, allowed_commands: Vec<String> },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScrumFsm;

impl ScrumFsm {
    /// Validates `command` against `state`, per the transition table
    /// below. Does not mutate anything; the caller applies `new_state`.
    pub fn validate(state: ScrumState, command: &Command) -> ScrumValidation {
        use ScrumState::{BacklogReady, Blocked, Idle, SprintActive, SprintPaused, SprintPlanned, SprintReview};

        if command.bypasses_scrum_validation() {
            return ScrumValidation::Ok { new_state: None };
        }

        let result = match command {
            Command::Epic { .. } => matches!(state, Idle | BacklogReady).then_some(None),
            Command::BacklogView { .. } | Command::BacklogAddStory { .. } | Command::BacklogPrioritize { .. } => {
                Some(None)
            }
            Command::SprintPlan { .. } => (state == BacklogReady).then_some(Some(SprintPlanned)),
            Command::SprintStart => (state == SprintPlanned).then_some(Some(SprintActive)),
            Command::SprintStatus => Some(None),
            Command::SprintPause => (state == SprintActive).then_some(Some(SprintPaused)),
            Command::SprintResume => (state == SprintPaused).then_some(Some(SprintActive)),
            Command::Approve { .. } => Some(None),
            Command::RequestChanges { .. } => (state == SprintReview).then_some(Some(BacklogReady)),
            Command::SuggestFix { .. } => (state == Blocked).then_some(None),
            Command::SkipTask => Some(None),
            Command::Feedback { .. } => (state == SprintReview).then_some(Some(Idle)),
            Command::State => Some(None),
            _ => None,
        };

        match result {
            Some(new_state) => ScrumValidation::Ok { new_state },
            None => ScrumValidation::Err {
                hint: format!("command not valid in state {state}"),
                allowed_commands: Self::allowed_commands(state),
            },
        }
    }

    /// Deterministic command list allowed from `state`.
    pub fn allowed_commands(state: ScrumState) -> Vec<String> {
        use ScrumState::{BacklogReady, Blocked, Idle, SprintActive, SprintPaused, SprintPlanned, SprintReview};

        let mut cmds = vec![
            "/backlog view".to_string(),
            "/backlog add_story".to_string(),
            "/backlog prioritize".to_string(),
            "/approve".to_string(),
            "/skip_task".to_string(),
            "/state".to_string(),
        ];
        match state {
            Idle | BacklogReady => cmds.push("/epic".to_string()),
            _ => {}
        }
        match state {
            BacklogReady => cmds.push("/sprint plan".to_string()),
            SprintPlanned => cmds.push("/sprint start".to_string()),
            SprintActive => cmds.push("/sprint pause".to_string()),
            SprintPaused => cmds.push("/sprint resume".to_string()),
            SprintReview => {
                cmds.push("/request_changes".to_string());
                cmds.push("/feedback".to_string());
            }
            Blocked => cmds.push("/suggest_fix".to_string()),
            SprintPlanned | SprintPaused => {}
        }
        cmds.push("/sprint status".to_string());
        cmds
    }

    /// True for states where the Orchestrator may advance without user
    /// input, e.g. `SPRINT_ACTIVE -> SPRINT_REVIEW` once all tasks complete.
    pub const fn can_auto_progress(state: ScrumState) -> bool {
        matches!(state, ScrumState::SprintActive)
    }

    /// Used only during crash recovery to restore a persisted state
    /// without validation.
    pub const fn force_state(s: ScrumState) -> ScrumState {
        s
    }
}
