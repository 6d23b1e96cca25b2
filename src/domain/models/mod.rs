//! Domain models
//!
//! Pure domain entities with business logic and validation rules.
//! These models are framework-agnostic and contain no infrastructure concerns.

pub mod approval;
pub mod background_task;
pub mod command;
pub mod config;
pub mod file_index;
pub mod scrum;
pub mod task;
pub mod tdd;

pub use approval::ApprovalRequest;
pub use background_task::{BackgroundTask, BackgroundTaskStatus, Priority, ScheduledTask, TASK_TYPES};
pub use command::{BacklogKind, Command, CommandResult};
pub use config::Config;
pub use file_index::{
    DependencyEdge, FileNode, FileType, MatchType, RelationType, RelevanceSignals, SearchKind, SearchResult,
};
pub use scrum::{Epic, EpicStatus, OrchestrationPolicy, Project, ScrumState, Sprint, SprintStatus, Story, StoryStatus};
pub use task::{AgentResult, AgentType, Task, TaskStatus};
pub use tdd::{TDDCycle, TDDTask, TddState};
