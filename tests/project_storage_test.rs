//! Atomic JSON project-snapshot persistence: saving and reloading a
//! project or TDD cycle must yield back the same state.

use std::collections::HashMap;

use orchard::domain::models::{OrchestrationPolicy, Project, ScrumState, TDDCycle};
use orchard::domain::ports::ProjectStorage;
use orchard::infrastructure::storage::FsProjectStorage;

fn storage_for(dir: &tempfile::TempDir, name: &str) -> FsProjectStorage {
    let mut roots = HashMap::new();
    roots.insert(name.to_string(), dir.path().join(".orch-state"));
    FsProjectStorage::new(roots)
}

#[tokio::test]
async fn saving_and_loading_a_project_preserves_state_and_active_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_for(&dir, "demo");

    let mut project = Project::new("demo", dir.path().to_path_buf(), OrchestrationPolicy::Autonomous);
    project.scrum_state = ScrumState::SprintActive;
    project.active_task_ids = vec![uuid::Uuid::new_v4(), uuid::Uuid::new_v4()];

    storage.save_project(&project).await.expect("save should succeed");
    let reloaded = storage.load_project("demo").await.expect("load should succeed").expect("snapshot should exist");

    assert_eq!(reloaded.scrum_state, project.scrum_state);
    assert_eq!(reloaded.active_task_ids, project.active_task_ids);
}

#[tokio::test]
async fn loading_an_unwritten_project_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_for(&dir, "demo");

    let result = storage.load_project("demo").await.expect("load should succeed");
    assert!(result.is_none());
}

#[tokio::test]
async fn tdd_cycle_round_trips_through_its_own_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_for(&dir, "demo");

    let cycle = TDDCycle::new(uuid::Uuid::new_v4());
    storage.save_tdd_cycle("demo", &cycle).await.expect("save should succeed");

    let reloaded = storage.load_tdd_cycle("demo", cycle.id).await.expect("load should succeed").expect("cycle should exist");
    assert_eq!(reloaded.id, cycle.id);
    assert_eq!(reloaded.story_id, cycle.story_id);
}

#[test]
fn file_node_serde_round_trips_including_a_null_last_accessed() {
    use orchard::domain::models::{FileNode, FileType};

    let node = FileNode::new("lib.rs", FileType::Source, 42, "abc123");
    assert!(node.last_accessed.is_none());

    let json = serde_json::to_string(&node).unwrap();
    let restored: FileNode = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.path, node.path);
    assert_eq!(restored.file_type, node.file_type);
    assert_eq!(restored.content_hash, node.content_hash);
    assert_eq!(restored.last_accessed, node.last_accessed);
}
