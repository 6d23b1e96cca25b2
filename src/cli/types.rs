//! CLI type definitions
//!
//! Clap command structures mirroring the Scrum/TDD command surface, plus a
//! conversion into [`crate::domain::models::Command`] so parsing happens
//! once at the edge and the orchestrator never matches on strings.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::domain::models::{BacklogKind, Command};

#[derive(Parser)]
#[command(name = "orchard")]
#[command(about = "Orchard - multi-project AI-agent orchestration engine", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project to target (must match a `projects[].name` entry in config)
    #[arg(short, long, global = true, default_value = "default")]
    pub project: String,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize `.orch/` configuration and per-project `.orch-state/`
    Init {
        /// Force reinitialization even if already initialized
        #[arg(short, long)]
        force: bool,

        /// Target directory (defaults to current directory)
        #[arg(default_value = ".")]
        path: std::path::PathBuf,
    },

    /// Create an epic
    Epic {
        /// Epic title (defaults to the description if omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// Epic description
        description: String,
    },

    /// Backlog operations
    #[command(subcommand)]
    Backlog(BacklogCommands),

    /// Sprint operations
    #[command(subcommand)]
    Sprint(SprintCommands),

    /// Approve pending items (agent hand-offs, escalations)
    Approve {
        /// Specific item ids to approve (defaults to all pending)
        #[arg(value_delimiter = ',')]
        item_ids: Vec<Uuid>,
    },

    /// Request changes on the current sprint review
    RequestChanges {
        description: String,
    },

    /// Suggest a fix while the project is `BLOCKED`
    SuggestFix {
        description: String,
    },

    /// Skip the current active task
    SkipTask,

    /// Submit retrospective feedback, closing the active sprint
    Feedback {
        description: String,
    },

    /// Show the current Scrum state
    State {
        /// Render the state machine as a diagram instead of a status line
        #[arg(long)]
        diagram: bool,
    },

    /// TDD cycle operations
    #[command(subcommand)]
    Tdd(TddCommands),
}

#[derive(Subcommand)]
pub enum BacklogCommands {
    /// View the product or sprint backlog
    View {
        /// `product` or `sprint`
        #[arg(default_value = "product")]
        backlog_type: String,
    },

    /// Add a story to the product backlog
    AddStory {
        #[arg(short, long)]
        title: Option<String>,

        description: String,

        /// Epic to attach this story to
        #[arg(short, long)]
        epic_id: Option<Uuid>,

        /// 1 = highest priority, 5 = lowest
        #[arg(short, long, default_value = "3")]
        priority: u8,
    },

    /// Reprioritize an existing story
    Prioritize {
        story_id: Uuid,
        priority: u8,
    },
}

#[derive(Subcommand)]
pub enum SprintCommands {
    /// Plan a sprint from backlog stories
    Plan {
        #[arg(value_delimiter = ',')]
        story_ids: Vec<Uuid>,
    },
    /// Start the most recently planned sprint
    Start,
    /// Show current sprint status
    Status,
    /// Pause the active sprint
    Pause,
    /// Resume a paused sprint
    Resume,
}

#[derive(Subcommand)]
pub enum TddCommands {
    /// Start a TDD cycle for a story
    Start {
        story_id: Uuid,

        /// Initial task description handed to the design agent
        #[arg(short, long)]
        task_description: Option<String>,
    },
    /// Show TDD cycle status
    Status {
        /// Defaults to all active cycles when omitted
        story_id: Option<Uuid>,
    },
    /// Advance to whatever phase comes next
    Next {
        /// Which story's cycle to advance; required when more than one
        /// cycle is active
        story_id: Option<Uuid>,
    },
    Design {
        story_id: Option<Uuid>,
    },
    Test {
        story_id: Option<Uuid>,
    },
    Code {
        story_id: Option<Uuid>,
    },
    Refactor {
        story_id: Option<Uuid>,
    },
    Commit {
        story_id: Option<Uuid>,
    },
    RunTests {
        story_id: Option<Uuid>,
    },
    /// Abort the active (or specified) cycle
    Abort {
        story_id: Option<Uuid>,
    },
    /// Show raw phase-history logs
    Logs,
    /// Show aggregate cycle metrics
    Overview,
}

impl Commands {
    /// Converts a parsed subcommand into the orchestrator's typed
    /// [`Command`]. `Init` has no domain-command counterpart; it is
    /// handled entirely in `main` before a project is even loaded.
    pub fn to_domain(&self) -> Option<Command> {
        Some(match self {
            Self::Init { .. } => return None,
            Self::Epic { title, description } => {
                Command::Epic { title: title.clone(), description: description.clone() }
            }
            Self::Backlog(BacklogCommands::View { backlog_type }) => Command::BacklogView {
                backlog_type: if backlog_type.eq_ignore_ascii_case("sprint") {
                    BacklogKind::Sprint
                } else {
                    BacklogKind::Product
                },
            },
            Self::Backlog(BacklogCommands::AddStory { title, description, epic_id, priority }) => {
                Command::BacklogAddStory {
                    title: title.clone(),
                    description: description.clone(),
                    epic_id: *epic_id,
                    priority: *priority,
                }
            }
            Self::Backlog(BacklogCommands::Prioritize { story_id, priority }) => {
                Command::BacklogPrioritize { story_id: *story_id, priority: *priority }
            }
            Self::Sprint(SprintCommands::Plan { story_ids }) => Command::SprintPlan { story_ids: story_ids.clone() },
            Self::Sprint(SprintCommands::Start) => Command::SprintStart,
            Self::Sprint(SprintCommands::Status) => Command::SprintStatus,
            Self::Sprint(SprintCommands::Pause) => Command::SprintPause,
            Self::Sprint(SprintCommands::Resume) => Command::SprintResume,
            Self::Approve { item_ids } => {
                Command::Approve { item_ids: if item_ids.is_empty() { None } else { Some(item_ids.clone()) } }
            }
            Self::RequestChanges { description } => Command::RequestChanges { description: description.clone() },
            Self::SuggestFix { description } => Command::SuggestFix { description: description.clone() },
            Self::SkipTask => Command::SkipTask,
            Self::Feedback { description } => Command::Feedback { description: description.clone() },
            Self::State { .. } => Command::State,
            Self::Tdd(TddCommands::Start { story_id, task_description }) => {
                Command::TddStart { story_id: *story_id, task_description: task_description.clone() }
            }
            Self::Tdd(TddCommands::Status { story_id }) => Command::TddStatus { story_id: *story_id },
            Self::Tdd(TddCommands::Next { story_id }) => Command::TddNext { story_id: *story_id },
            Self::Tdd(TddCommands::Design { story_id }) => Command::TddDesign { story_id: *story_id },
            Self::Tdd(TddCommands::Test { story_id }) => Command::TddTest { story_id: *story_id },
            Self::Tdd(TddCommands::Code { story_id }) => Command::TddCode { story_id: *story_id },
            Self::Tdd(TddCommands::Refactor { story_id }) => Command::TddRefactor { story_id: *story_id },
            Self::Tdd(TddCommands::Commit { story_id }) => Command::TddCommit { story_id: *story_id },
            Self::Tdd(TddCommands::RunTests { story_id }) => Command::TddRunTests { story_id: *story_id },
            Self::Tdd(TddCommands::Abort { story_id }) => Command::TddAbort { story_id: *story_id },
            Self::Tdd(TddCommands::Logs) => Command::TddLogs,
            Self::Tdd(TddCommands::Overview) => Command::TddOverview,
        })
    }

    /// Whether `/state --diagram` was requested; irrelevant for every other
    /// variant.
    pub const fn wants_diagram(&self) -> bool {
        matches!(self, Self::State { diagram: true })
    }
}
