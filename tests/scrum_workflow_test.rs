//! End-to-end Scrum board progression driven entirely through the
//! public `Orchestrator` command API, and `ScrumState` round-tripping.

mod common;

use orchard::domain::models::{BacklogKind, Command, OrchestrationPolicy, ScrumState};

#[tokio::test]
async fn happy_path_scrum_cycle_reaches_sprint_review() {
    let (orchestrator, _dir) = common::orchestrator_with_project("demo", OrchestrationPolicy::Autonomous);

    let result = orchestrator
        .handle_command(Command::Epic { title: None, description: "Login".to_string() }, "demo")
        .await;
    assert!(result.ok);
    assert_eq!(result.current_state.as_deref(), None);

    let state = orchestrator.handle_command(Command::State, "demo").await;
    assert_eq!(state.payload.get("scrum_state").and_then(|v| v.as_str()), Some("backlog_ready"));

    let result = orchestrator
        .handle_command(
            Command::BacklogAddStory {
                title: None,
                description: "User can sign in".to_string(),
                epic_id: None,
                priority: 2,
            },
            "demo",
        )
        .await;
    assert!(result.ok);
    let story_id: uuid::Uuid = serde_json::from_value(result.payload["story_id"].clone()).unwrap();

    let view = orchestrator.handle_command(Command::BacklogView { backlog_type: BacklogKind::Product }, "demo").await;
    let stories = view.payload["stories"].as_array().unwrap();
    assert_eq!(stories.len(), 1);

    let result = orchestrator.handle_command(Command::SprintPlan { story_ids: vec![story_id] }, "demo").await;
    assert!(result.ok);

    let state = orchestrator.handle_command(Command::State, "demo").await;
    assert_eq!(state.payload.get("scrum_state").and_then(|v| v.as_str()), Some("sprint_planned"));

    let result = orchestrator.handle_command(Command::SprintStart, "demo").await;
    assert!(result.ok);

    let state = orchestrator.handle_command(Command::State, "demo").await;
    assert_eq!(state.payload.get("scrum_state").and_then(|v| v.as_str()), Some("sprint_active"));

    // Autonomous policy with no active tasks; reconciliation advances
    // SPRINT_ACTIVE -> SPRINT_REVIEW once every active task has completed.
    orchestrator.reconcile_once().await;

    let state = orchestrator.handle_command(Command::State, "demo").await;
    assert_eq!(state.payload.get("scrum_state").and_then(|v| v.as_str()), Some("sprint_review"));
}

#[tokio::test]
async fn sprint_plan_rejected_outside_backlog_ready() {
    let (orchestrator, _dir) = common::orchestrator_with_project("demo", OrchestrationPolicy::Autonomous);

    let result = orchestrator.handle_command(Command::SprintPlan { story_ids: vec![] }, "demo").await;
    assert!(!result.ok);
    assert_eq!(result.current_state.as_deref(), Some("idle"));
    assert!(result.allowed_commands.is_some());
}

#[tokio::test]
async fn resubmitting_an_invalid_sprint_plan_after_restart_fails_the_same_way() {
    let dir = common::temp_dir();
    let orchestrator = common::orchestrator_at("demo", dir.path(), OrchestrationPolicy::Autonomous);

    // SPRINT_PLAN is only valid from BACKLOG_READY; from the project's
    // initial IDLE state this is a pure FSM validation failure.
    let first = orchestrator.handle_command(Command::SprintPlan { story_ids: vec![] }, "demo").await;
    assert!(!first.ok);

    // Simulate a restart: rebuild the orchestrator over the same persisted
    // `.orch-state` snapshot and replay the identical command.
    drop(orchestrator);
    let orchestrator = common::orchestrator_reloaded("demo", dir.path(), OrchestrationPolicy::Autonomous).await;
    let second = orchestrator.handle_command(Command::SprintPlan { story_ids: vec![] }, "demo").await;

    assert_eq!(first.error, second.error);
    assert_eq!(first.current_state, second.current_state);
}

#[tokio::test]
async fn unknown_project_is_rejected() {
    let (orchestrator, _dir) = common::orchestrator_with_project("demo", OrchestrationPolicy::Autonomous);
    let result = orchestrator.handle_command(Command::State, "ghost").await;
    assert!(!result.ok);
    assert!(result.error.unwrap().contains("unknown project"));
}

#[test]
fn scrum_state_display_round_trips_through_every_variant() {
    for state in [
        ScrumState::Idle,
        ScrumState::BacklogReady,
        ScrumState::SprintPlanned,
        ScrumState::SprintActive,
        ScrumState::SprintPaused,
        ScrumState::SprintReview,
        ScrumState::Blocked,
    ] {
        let rendered = state.to_string();
        assert!(!rendered.is_empty());
    }
}
