//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use orchard::domain::models::{AgentType, OrchestrationPolicy, Project};
use orchard::domain::ports::{Agent, NullAgent, ProjectStorage};
use orchard::infrastructure::storage::FsProjectStorage;
use orchard::services::Orchestrator;
use tempfile::TempDir;

/// Create a temporary directory for test isolation.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("failed to create temp dir")
}

/// Builds an [`Orchestrator`] over a single project named `name`, backed
/// by an [`FsProjectStorage`] rooted at a fresh temp directory, with a
/// [`NullAgent`] registered for every [`AgentType`].
pub fn orchestrator_with_project(name: &str, policy: OrchestrationPolicy) -> (Orchestrator, TempDir) {
    let dir = temp_dir();
    let state_dir = dir.path().join(".orch-state");
    let mut roots = HashMap::new();
    roots.insert(name.to_string(), state_dir);
    let storage: Arc<dyn ProjectStorage> = Arc::new(FsProjectStorage::new(roots));

    let project = Project::new(name.to_string(), dir.path().to_path_buf(), policy);

    let mut agents: HashMap<AgentType, Arc<dyn Agent>> = HashMap::new();
    for agent_type in [AgentType::Design, AgentType::Qa, AgentType::Code, AgentType::Data] {
        agents.insert(agent_type, Arc::new(NullAgent::new()));
    }

    (Orchestrator::new(vec![project], storage, agents), dir)
}

/// Like [`orchestrator_with_project`], but the caller owns the root
/// directory so a second orchestrator can later be built over the same
/// `.orch-state` snapshot to simulate a restart.
pub fn orchestrator_at(name: &str, root: &std::path::Path, policy: OrchestrationPolicy) -> Orchestrator {
    let state_dir = root.join(".orch-state");
    let mut roots = HashMap::new();
    roots.insert(name.to_string(), state_dir);
    let storage: Arc<dyn ProjectStorage> = Arc::new(FsProjectStorage::new(roots));

    let project = Project::new(name.to_string(), root.to_path_buf(), policy);

    let mut agents: HashMap<AgentType, Arc<dyn Agent>> = HashMap::new();
    for agent_type in [AgentType::Design, AgentType::Qa, AgentType::Code, AgentType::Data] {
        agents.insert(agent_type, Arc::new(NullAgent::new()));
    }

    Orchestrator::new(vec![project], storage, agents)
}

/// Builds an [`Orchestrator`] backed by an [`FsProjectStorage`] rooted at
/// an already-persisted `.orch-state` directory, reloading the prior
/// snapshot if one exists. Used to simulate a process restart over the
/// same state on disk.
pub async fn orchestrator_reloaded(name: &str, root: &std::path::Path, policy: OrchestrationPolicy) -> Orchestrator {
    let state_dir = root.join(".orch-state");
    let mut roots = HashMap::new();
    roots.insert(name.to_string(), state_dir);
    let storage: Arc<dyn ProjectStorage> = Arc::new(FsProjectStorage::new(roots));

    let project = match storage.load_project(name).await {
        Ok(Some(persisted)) => persisted,
        _ => Project::new(name.to_string(), root.to_path_buf(), policy),
    };

    let mut agents: HashMap<AgentType, Arc<dyn Agent>> = HashMap::new();
    for agent_type in [AgentType::Design, AgentType::Qa, AgentType::Code, AgentType::Data] {
        agents.insert(agent_type, Arc::new(NullAgent::new()));
    }

    Orchestrator::new(vec![project], storage, agents)
}

#[allow(dead_code)]
pub fn project_root_for(dir: &TempDir) -> PathBuf {
    dir.path().to_path_buf()
}
