//! Orchard - multi-project AI-agent orchestration engine
//!
//! Coordinates a dual Scrum/TDD state machine, policy-gated agent dispatch,
//! a priority background task scheduler, and a context-aware file
//! relevance index across one or more managed projects:
//! - Hexagonal layering: domain (pure) -> services (orchestration) ->
//!   infrastructure (sqlite, fs, config, logging) -> cli
//! - Hierarchical figment configuration with `ORCHARD_`-prefixed env
//!   overrides
//! - Atomic JSON project snapshots under `.orch-state/`
//! - SQLite-backed context index with WAL mode

pub mod cli;
pub mod domain;
pub mod services;
pub mod infrastructure;

// Re-export key types for convenience
pub use domain::errors::{OrchardError, OrchardResult};
pub use domain::models::Config;
pub use infrastructure::database::DatabaseConnection;
pub use services::Orchestrator;
