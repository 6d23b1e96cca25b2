//! Application services: the orchestration, scheduling, and indexing logic
//! built on top of the domain layer's pure entities and ports.

pub mod background_scheduler;
pub mod context_filter;
pub mod context_index;
pub mod dependency_tracker;
pub mod failure_recovery;
pub mod orchestrator;
pub mod scrum_fsm;
pub mod tdd_fsm;

pub use background_scheduler::{BackgroundScheduler, SchedulerStats};
pub use context_filter::{filter_content, ContextFilter, ContextFilterConfig, FilteredContent, RelevanceRequest, ScoredFile};
pub use context_index::ContextIndex;
pub use dependency_tracker::{DependencyTracker, RelatedFiles, UpdateRecommendation};
pub use orchestrator::Orchestrator;
pub use scrum_fsm::{ScrumFsm, ScrumValidation};
pub use tdd_fsm::{TddFsm, TddTransition};
