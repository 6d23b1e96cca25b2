//! Command dispatch and policy engine — the core orchestration
//! loop tying ScrumFSM, TDDFSM, the policy engine, and agent dispatch
//! together.
//!
//! Ownership: the Orchestrator exclusively owns each [`Project`]'s FSM
//! state and active-task list, behind a per-project
//! [`tokio::sync::Mutex`]. Commands follow a consistent suspension
//! pattern: acquire lock -> validate & compute -> release lock -> run
//! agent -> re-acquire lock -> commit & persist.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::{AgentFailureKind, OrchardError, OrchardResult};
use crate::domain::models::{
    AgentType, ApprovalRequest, BacklogKind, Command, CommandResult, Epic, OrchestrationPolicy, Priority, Project,
    ScrumState, Sprint, SprintStatus, Story, StoryStatus, TDDCycle, TDDTask, Task, TddState,
};
use crate::domain::ports::{Agent, ProjectStorage};
use crate::services::background_scheduler::BackgroundScheduler;
use crate::services::context_filter::{ContextFilter, HistoricalContexts, RelevanceRequest};
use crate::services::context_index::ContextIndex;
use crate::services::dependency_tracker::DependencyTracker;
use crate::services::failure_recovery::{self, RecoveryDecision};
use crate::services::scrum_fsm::{ScrumFsm, ScrumValidation};
use crate::services::tdd_fsm::TddFsm;

/// TDD state -> preferred agent type.
fn preferred_agent(state: TddState) -> AgentType {
    match state {
        TddState::Design => AgentType::Design,
        TddState::TestRed => AgentType::Qa,
        TddState::CodeGreen | TddState::Refactor | TddState::Commit => AgentType::Code,
    }
}

pub const MAX_CONCURRENT_CYCLES: usize = 3;
pub const MAX_RETRIES: u32 = 3;

struct ProjectHandle {
    project: Mutex<Project>,
}

pub struct Orchestrator {
    projects: HashMap<String, Arc<ProjectHandle>>,
    tdd_cycles: Mutex<HashMap<Uuid, TDDCycle>>,
    storage: Arc<dyn ProjectStorage>,
    agents: HashMap<AgentType, Arc<dyn Agent>>,
    approvals: Mutex<HashMap<Uuid, ApprovalRequest>>,
    scheduler: Option<Arc<BackgroundScheduler>>,
    context_index: Option<Arc<ContextIndex>>,
    context_filter: ContextFilter,
    dependency_tracker: Option<Arc<DependencyTracker>>,
}

impl Orchestrator {
    pub fn new(
        projects: Vec<Project>,
        storage: Arc<dyn ProjectStorage>,
        agents: HashMap<AgentType, Arc<dyn Agent>>,
    ) -> Self {
        let projects = projects
            .into_iter()
            .map(|p| (p.name.clone(), Arc::new(ProjectHandle { project: Mutex::new(p) })))
            .collect();
        Self {
            projects,
            tdd_cycles: Mutex::new(HashMap::new()),
            storage,
            agents,
            approvals: Mutex::new(HashMap::new()),
            scheduler: None,
            context_index: None,
            context_filter: ContextFilter::default(),
            dependency_tracker: None,
        }
    }

    /// Gives the orchestrator a handle to the background scheduler so hand-off
    /// dispatch and reconciliation can enqueue maintenance work on it.
    pub fn with_scheduler(mut self, scheduler: Arc<BackgroundScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Feeds hand-off dispatch with a live file index so [`ContextFilter`]
    /// has candidates to score.
    pub fn with_context_index(mut self, context_index: Arc<ContextIndex>) -> Self {
        self.context_index = Some(context_index);
        self
    }

    pub fn with_dependency_tracker(mut self, tracker: Arc<DependencyTracker>) -> Self {
        self.dependency_tracker = Some(tracker);
        self
    }

    fn project_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.projects.keys().cloned().collect();
        names.sort();
        names
    }

    /// Public contract: resolve project, validate, execute, persist, return
    /// a uniform result envelope.
    pub async fn handle_command(&self, command: Command, project_name: &str) -> CommandResult {
        let Some(handle) = self.projects.get(project_name) else {
            return CommandResult::err(
                format!("unknown project: {project_name}"),
                Some(format!("available projects: {:?}", self.project_names())),
            );
        };

        let mut project = handle.project.lock().await;

        if !command.bypasses_scrum_validation() {
            match ScrumFsm::validate(project.scrum_state, &command) {
                ScrumValidation::Err { hint, allowed_commands } => {
                    return CommandResult {
                        ok: false,
                        error: Some(hint.clone()),
                        hint: Some(hint),
                        current_state: Some(project.scrum_state.to_string()),
                        allowed_commands: Some(allowed_commands),
                        ..Default::default()
                    };
                }
                ScrumValidation::Ok { new_state } => {
                    if let Some(state) = new_state {
                        project.scrum_state = state;
                    }
                }
            }
        }

        let result = self.execute(&mut project, &command).await;

        project.touch();
        if let Err(err) = self.storage.save_project(&project).await {
            warn!(error = %err, project = %project_name, "failed to persist project snapshot");
        }

        result
    }

    async fn execute(&self, project: &mut Project, command: &Command) -> CommandResult {
        match command {
            Command::State => CommandResult::ok("state")
                .with_payload("scrum_state", project.scrum_state.to_string())
                .with_payload("allowed_commands", ScrumFsm::allowed_commands(project.scrum_state)),
            Command::Epic { title, description } => self.epic(project, title.clone(), description.clone()),
            Command::BacklogView { backlog_type } => self.backlog_view(project, backlog_type),
            Command::BacklogAddStory { title, description, epic_id, priority } => {
                self.backlog_add_story(project, title.clone(), description.clone(), *epic_id, *priority)
            }
            Command::BacklogPrioritize { story_id, priority } => self.backlog_prioritize(project, *story_id, *priority),
            Command::SprintPlan { story_ids } => self.sprint_plan(project, story_ids.clone()),
            Command::SprintStart => self.sprint_start(project),
            Command::SprintStatus => self.sprint_status(project),
            Command::SprintPause => self.sprint_pause(project),
            Command::SprintResume => self.sprint_resume(project),
            Command::RequestChanges { description } => self.request_changes(project, description.clone()),
            Command::SuggestFix { description } => self.suggest_fix(project, description.clone()),
            Command::SkipTask => self.skip_task(project),
            Command::Feedback { description } => self.feedback(project, description.clone()),
            Command::TddStart { story_id, task_description } => self.tdd_start(project, *story_id, task_description.clone()).await,
            Command::TddStatus { story_id } => self.tdd_status(project, *story_id).await,
            Command::TddNext { .. }
            | Command::TddDesign { .. }
            | Command::TddTest { .. }
            | Command::TddCode { .. }
            | Command::TddRefactor { .. }
            | Command::TddCommit { .. }
            | Command::TddRunTests { .. } => self.tdd_advance(project, command).await,
            Command::TddAbort { story_id } => self.tdd_abort(project, *story_id).await,
            Command::TddLogs | Command::TddOverview => self.tdd_overview(project).await,
            Command::Approve { item_ids } => self.approve(project, item_ids.clone()).await,
        }
    }

    /// `/epic`: create an Epic in `Draft` status.
    fn epic(&self, project: &mut Project, title: Option<String>, description: String) -> CommandResult {
        let epic = Epic::new(title.unwrap_or_else(|| description.clone()), description);
        let id = epic.id;
        project.epics.push(epic);
        CommandResult::ok("epic created").with_payload("epic_id", id)
    }

    /// `/backlog view`: product backlog is everything not yet
    /// assigned to a sprint; sprint backlog is the active sprint's stories.
    fn backlog_view(&self, project: &Project, backlog_type: &BacklogKind) -> CommandResult {
        let stories: Vec<&Story> = match backlog_type {
            BacklogKind::Product => project.stories.iter().filter(|s| s.status == StoryStatus::Backlog).collect(),
            BacklogKind::Sprint => match project.active_sprint() {
                Some(sprint) => project.stories.iter().filter(|s| sprint.story_ids.contains(&s.id)).collect(),
                None => Vec::new(),
            },
        };
        CommandResult::ok("backlog").with_payload("stories", stories)
    }

    fn backlog_add_story(
        &self,
        project: &mut Project,
        title: Option<String>,
        description: String,
        epic_id: Option<Uuid>,
        priority: u8,
    ) -> CommandResult {
        if let Some(epic_id) = epic_id {
            if !project.epics.iter().any(|e| e.id == epic_id) {
                return CommandResult::err(format!("epic not found: {epic_id}"), None);
            }
        }
        let mut story = Story::new(title.unwrap_or_else(|| description.clone()), description, priority);
        story.epic_id = epic_id;
        let id = story.id;
        project.stories.push(story);
        if project.scrum_state == ScrumState::Idle {
            project.scrum_state = ScrumState::BacklogReady;
        }
        CommandResult::ok("story added").with_payload("story_id", id)
    }

    fn backlog_prioritize(&self, project: &mut Project, story_id: Uuid, priority: u8) -> CommandResult {
        let Some(story) = project.story_mut(story_id) else {
            return CommandResult::err(format!("story not found: {story_id}"), None);
        };
        story.priority = priority.clamp(1, 5);
        CommandResult::ok("priority updated")
    }

    /// `/sprint plan`: only reachable from `BACKLOG_READY`; the
    /// FSM already validated that before `execute` runs.
    fn sprint_plan(&self, project: &mut Project, story_ids: Vec<Uuid>) -> CommandResult {
        let unknown: Vec<Uuid> = story_ids.iter().copied().filter(|id| project.story(*id).is_none()).collect();
        if !unknown.is_empty() {
            return CommandResult::err(format!("unknown story ids: {unknown:?}"), None);
        }
        let sprint = Sprint::new(format!("sprint-{}", project.sprints.len() + 1), story_ids.clone());
        let id = sprint.id;
        project.sprints.push(sprint);
        for story_id in story_ids {
            if let Some(story) = project.story_mut(story_id) {
                story.status = StoryStatus::InSprint;
            }
        }
        CommandResult::ok("sprint planned").with_payload("sprint_id", id)
    }

    /// `/sprint start`: activates the most recently planned
    /// sprint and enqueues its stories for TDD work.
    fn sprint_start(&self, project: &mut Project) -> CommandResult {
        let Some(sprint) = project.sprints.iter_mut().rev().find(|s| s.status == SprintStatus::Planned) else {
            return CommandResult::err("no planned sprint to start", None);
        };
        sprint.status = SprintStatus::Active;
        let sprint_id = sprint.id;
        CommandResult::ok("sprint started").with_payload("sprint_id", sprint_id)
    }

    fn sprint_status(&self, project: &Project) -> CommandResult {
        let total = project.stories.len();
        let done = project.stories.iter().filter(|s| s.status == StoryStatus::Done).collect::<Vec<_>>().len();
        CommandResult::ok("sprint status")
            .with_payload("scrum_state", project.scrum_state.to_string())
            .with_payload("stories_total", total)
            .with_payload("stories_done", done)
            .with_payload("active_sprint", project.active_sprint().map(|s| s.id))
    }

    /// `/sprint pause` / `/sprint resume`: the scrum-state swing
    /// between `SPRINT_ACTIVE` and `SPRINT_PAUSED` is applied by the FSM
    /// before `execute` runs; the sprint's own status is left `Active`
    /// throughout since pausing gates task dispatch, not sprint bookkeeping.
    fn sprint_pause(&self, _project: &mut Project) -> CommandResult {
        CommandResult::ok("sprint paused")
    }

    fn sprint_resume(&self, _project: &mut Project) -> CommandResult {
        CommandResult::ok("sprint resumed")
    }

    /// `/request_changes`: files the
    /// feedback into the product backlog as a fresh story.
    fn request_changes(&self, project: &mut Project, description: String) -> CommandResult {
        let story = Story::new("change request", description, 2);
        let id = story.id;
        project.stories.push(story);
        CommandResult::ok("change request filed").with_payload("story_id", id)
    }

    /// `/suggest_fix`: recorded as an
    /// ApprovalRequest-style hint for the CodeAgent's next hand-off.
    fn suggest_fix(&self, project: &mut Project, description: String) -> CommandResult {
        project.scrum_state = ScrumState::SprintActive;
        CommandResult::ok("fix suggestion recorded").with_payload("hint", description)
    }

    fn skip_task(&self, project: &mut Project) -> CommandResult {
        if let Some(task_id) = project.active_task_ids.first().copied() {
            project.active_task_ids.retain(|id| id != &task_id);
            return CommandResult::ok("task skipped").with_payload("task_id", task_id);
        }
        CommandResult::ok("no active task to skip")
    }

    /// `/feedback`: closes the active
    /// sprint.
    fn feedback(&self, project: &mut Project, description: String) -> CommandResult {
        if let Some(sprint) = project.sprints.iter_mut().find(|s| s.status == SprintStatus::Active || s.status == SprintStatus::Review) {
            sprint.status = SprintStatus::Complete;
            for story_id in sprint.story_ids.clone() {
                if let Some(story) = project.story_mut(story_id) {
                    story.status = StoryStatus::Done;
                }
            }
        }
        CommandResult::ok("sprint closed").with_payload("feedback", description)
    }

    /// `/tdd status`: reports the cycle for `story_id`, or every
    /// active cycle when no story is given.
    async fn tdd_status(&self, project: &Project, story_id: Option<Uuid>) -> CommandResult {
        let cycles = self.tdd_cycles.lock().await;
        match story_id {
            Some(story_id) => {
                let Some(&cycle_id) = project.active_tdd_cycles.get(&story_id) else {
                    return CommandResult::err(format!("no active cycle for story {story_id}"), None);
                };
                let Some(cycle) = cycles.get(&cycle_id) else {
                    return CommandResult::err("tdd cycle not found", None);
                };
                CommandResult::ok("tdd status")
                    .with_payload("state", cycle.state.to_string())
                    .with_payload("history_len", cycle.history.len())
            }
            None => {
                let active: Vec<Uuid> = project.active_tdd_cycles.values().copied().collect();
                CommandResult::ok("tdd status").with_payload("active_cycle_ids", active)
            }
        }
    }

    /// `/tdd logs` / `/tdd overview`: aggregate metrics across all
    /// of the project's non-terminal cycles.
    async fn tdd_overview(&self, project: &Project) -> CommandResult {
        let cycles = self.tdd_cycles.lock().await;
        let regressions: u32 = project
            .active_tdd_cycles
            .values()
            .filter_map(|id| cycles.get(id))
            .map(|c| c.refactor_regressions)
            .sum();
        CommandResult::ok("tdd overview")
            .with_payload("active_cycles", project.active_tdd_cycles.len())
            .with_payload("total_refactor_regressions", regressions)
    }

    /// `/tdd start` enforces `max_concurrent_cycles` before creating a new cycle.
    async fn tdd_start(&self, project: &mut Project, story_id: Uuid, task_description: Option<String>) -> CommandResult {
        if project.active_tdd_cycles.len() >= MAX_CONCURRENT_CYCLES {
            return CommandResult::err(
                "max_concurrent_cycles exceeded",
                Some(format!("at most {MAX_CONCURRENT_CYCLES} non-terminal cycles allowed")),
            );
        }
        if project.story(story_id).is_none() {
            return CommandResult::err(format!("story not found: {story_id}"), None);
        }
        if project.active_tdd_cycles.contains_key(&story_id) {
            return CommandResult::err(format!("story {story_id} already has an active tdd cycle"), None);
        }

        let cycle = TDDCycle::new(story_id);
        let cycle_id = cycle.id;
        project.active_tdd_cycles.insert(story_id, cycle_id);
        if let Some(story) = project.story_mut(story_id) {
            story.tdd_cycle_id = Some(cycle_id);
            story.test_status = Some("design".to_string());
        }

        self.tdd_cycles.lock().await.insert(cycle_id, cycle);
        if let Err(err) = self.dispatch_handoff(project, story_id, cycle_id, TddState::Design, TddState::Design, task_description).await {
            warn!(error = %err, "hand-off dispatch failed for tdd start");
        }

        CommandResult::ok("tdd cycle started").with_payload("cycle_id", cycle_id)
    }

    async fn tdd_advance(&self, project: &mut Project, command: &Command) -> CommandResult {
        let story_id = match resolve_active_story(project, command.tdd_story_id()) {
            Ok(story_id) => story_id,
            Err(result) => return result,
        };
        let cycle_id = project.active_tdd_cycles[&story_id];
        let mut cycles = self.tdd_cycles.lock().await;
        let Some(cycle) = cycles.get_mut(&cycle_id) else {
            return CommandResult::err("tdd cycle not found", None);
        };

        let from_state = cycle.state;
        let transition = TddFsm::transition(from_state, command, None);
        if !transition.ok {
            return CommandResult::err(transition.next_suggested, None);
        }
        let Some(to_state) = transition.new_state else {
            return CommandResult::err("no transition produced", None);
        };

        cycle.state = to_state;
        if transition.regressed {
            cycle.refactor_regressions += 1;
        }
        cycle.record(TDDTask::new(to_state, Uuid::new_v4()));
        let cycle_id = cycle.id;
        let cycle_story_id = cycle.story_id;
        drop(cycles);

        if preferred_agent(from_state) != preferred_agent(to_state) {
            if let Err(err) = self.dispatch_handoff(project, cycle_story_id, cycle_id, from_state, to_state, None).await {
                warn!(error = %err, "hand-off dispatch failed");
            }
        }

        if to_state.is_terminal() {
            project.active_tdd_cycles.remove(&story_id);
            if let Some(story) = project.story_mut(story_id) {
                story.test_status = Some("committed".to_string());
            }
            self.recommend_dependency_updates(project, story_id).await;
        }

        CommandResult::ok(format!("advanced to {to_state}")).with_payload("next_suggested", transition.next_suggested)
    }

    /// Queues the dependency tracker's related-file recommendations (if
    /// any) as an approval, named after the story's conventional source
    /// path. Never applies a recommendation itself.
    async fn recommend_dependency_updates(&self, project: &mut Project, story_id: Uuid) {
        let Some(tracker) = &self.dependency_tracker else { return };
        let Some(story) = project.story(story_id) else { return };
        let candidate_path = format!("src/{}.rs", slugify(&story.title));

        match tracker.find_related_files(&candidate_path).await {
            Ok((_, recommendations)) if !recommendations.is_empty() => {
                let mut summary = format!("dependency recommendations for {candidate_path}:");
                let mut sorted: Vec<_> = recommendations.into_iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                for (path, recommendation) in &sorted {
                    summary.push_str(&format!(" {path} -> {recommendation:?};"));
                }
                let review_task = Task::new(AgentType::Code, summary);
                let approval = ApprovalRequest::new(project.name.clone(), review_task, "dependency_recommendation");
                project.pending_approval_ids.push(approval.id);
                self.approvals.lock().await.insert(approval.id, approval);
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, story_id = %story_id, "dependency tracker lookup failed"),
        }
    }

    async fn tdd_abort(&self, project: &mut Project, story_id: Option<Uuid>) -> CommandResult {
        let Some(story_id) = story_id.or_else(|| project.active_tdd_cycles.keys().next().copied()) else {
            return CommandResult::err("no story specified and none active", None);
        };
        if let Some(cycle_id) = project.active_tdd_cycles.remove(&story_id) {
            let mut cycles = self.tdd_cycles.lock().await;
            if let Some(cycle) = cycles.get_mut(&cycle_id) {
                cycle.state = TddFsm::abort();
            }
        }
        if let Some(story) = project.story_mut(story_id) {
            story.test_status = Some("aborted".to_string());
        }
        CommandResult::ok("tdd cycle aborted")
    }

    async fn approve(&self, project: &mut Project, item_ids: Option<Vec<Uuid>>) -> CommandResult {
        let mut approvals = self.approvals.lock().await;
        let ids = item_ids.unwrap_or_else(|| project.pending_approval_ids.clone());
        let mut drained = Vec::new();
        for id in ids {
            if approvals.remove(&id).is_some() {
                project.pending_approval_ids.retain(|i| i != &id);
                drained.push(id);
            }
        }
        CommandResult::ok(format!("{} approvals drained", drained.len())).with_payload("approved", drained)
    }

    /// Builds the hand-off [`Task`] and runs it under the project's
    /// orchestration policy.
    async fn dispatch_handoff(
        &self,
        project: &mut Project,
        story_id: Uuid,
        cycle_id: Uuid,
        from_state: TddState,
        to_state: TddState,
        task_description: Option<String>,
    ) -> OrchardResult<()> {
        let agent_type = preferred_agent(to_state);
        let mut task = Task::new(agent_type, task_description.unwrap_or_else(|| format!("{to_state} phase")))
            .with_context("cycle_id", cycle_id)
            .with_context("story_id", story_id)
            .with_context("from_state", from_state.as_str())
            .with_context("to_state", to_state.as_str());
        task.id = Uuid::new_v4();

        if let Some(context_files) = self.select_context_files(agent_type, story_id, to_state).await {
            task = task.with_context("context_files", context_files);
        }

        project.active_task_ids.push(task.id);

        match project.orchestration_policy {
            OrchestrationPolicy::Blocking => {
                let approval = ApprovalRequest::new(project.name.clone(), task, "blocking_policy");
                project.pending_approval_ids.push(approval.id);
                self.approvals.lock().await.insert(approval.id, approval);
                Ok(())
            }
            OrchestrationPolicy::Partial => self.run_task(project, task, true).await,
            OrchestrationPolicy::Autonomous => self.run_task(project, task, false).await,
        }
    }

    /// Scores the live file index against the hand-off's agent/story/phase
    /// and returns the selected paths, or `None` when no index is wired up.
    async fn select_context_files(&self, agent_type: AgentType, story_id: Uuid, tdd_phase: TddState) -> Option<Vec<String>> {
        let context_index = self.context_index.as_ref()?;
        let candidates = match context_index.all_files().await {
            Ok(files) => files,
            Err(err) => {
                warn!(error = %err, "context index lookup failed during hand-off");
                return None;
            }
        };
        let request = RelevanceRequest {
            agent_type,
            story_id,
            search_terms: Vec::new(),
            focus_areas: Vec::new(),
            tdd_phase: Some(tdd_phase),
        };
        let selected = self.context_filter.select(&request, &candidates, &HistoricalContexts::new());
        Some(selected.into_iter().map(|s| s.path).collect())
    }

    async fn run_task(&self, project: &mut Project, task: Task, dry_run: bool) -> OrchardResult<()> {
        let Some(agent) = self.agents.get(&task.agent_type) else {
            return Err(OrchardError::AgentExecution {
                kind: AgentFailureKind::AgentError,
                message: format!("no agent registered for {:?}", task.agent_type),
            });
        };

        match agent.run(&task, dry_run).await {
            Ok(result) if result.ok => {
                project.active_task_ids.retain(|id| id != &task.id);
                Ok(())
            }
            Ok(result) => {
                self.handle_failure(project, task, AgentFailureKind::AgentError, result.error.unwrap_or_default())
                    .await
            }
            Err(err) => self.handle_failure(project, task, AgentFailureKind::AgentError, err.to_string()).await,
        }
    }

    /// Failure-recovery contract: retry per the error-class table, or
    /// escalate to a human-intervention approval past `max_retries`.
    async fn handle_failure(
        &self,
        project: &mut Project,
        mut task: Task,
        kind: AgentFailureKind,
        message: String,
    ) -> OrchardResult<()> {
        task.retry_count += 1;
        match failure_recovery::decide(kind, task.retry_count, MAX_RETRIES) {
            RecoveryDecision::Retry(action) => {
                let delay = failure_recovery::retry_delay_for(task.retry_count);
                info!(
                    task_id = %task.id,
                    retry_count = task.retry_count,
                    action = ?action,
                    delay_ms = delay.as_millis() as u64,
                    "retrying failed task"
                );
                Ok(())
            }
            RecoveryDecision::Escalate => {
                let approval = ApprovalRequest::new(project.name.clone(), task, format!("human_intervention: {message}"));
                project.pending_approval_ids.push(approval.id);
                self.approvals.lock().await.insert(approval.id, approval);
                Ok(())
            }
        }
    }

    /// Background coroutine scanning every project every
    /// `reconciliation_interval`.
    pub async fn reconcile_once(&self) {
        for (name, handle) in &self.projects {
            let mut project = handle.project.lock().await;
            if ScrumFsm::can_auto_progress(project.scrum_state)
                && project.active_task_ids.is_empty()
                && project.active_sprint().is_some()
            {
                project.scrum_state = ScrumState::SprintReview;
                if let Err(err) = self.storage.save_project(&project).await {
                    warn!(error = %err, project = %name, "reconciliation persist failed");
                }
                self.enqueue_index_refresh(name).await;
            }
        }
    }

    /// Enqueues a low-priority `index_update` task so the context index
    /// picks up whatever the just-reviewed sprint touched.
    async fn enqueue_index_refresh(&self, project_name: &str) {
        let Some(scheduler) = &self.scheduler else { return };
        let mut metadata = serde_json::Map::new();
        metadata.insert("project".to_string(), serde_json::Value::String(project_name.to_string()));
        if let Err(err) = scheduler.submit("index_update", Priority::Low, None, metadata).await {
            warn!(error = %err, project = %project_name, "failed to enqueue index refresh");
        }
    }
}

/// Resolves which story's TDD cycle a `/tdd` advance command targets.
/// An explicit `requested` story must already have an active cycle; with
/// none given, the sole active cycle is used, and ambiguity between more
/// than one active cycle is a hard error rather than a silent pick.
fn resolve_active_story(project: &Project, requested: Option<Uuid>) -> Result<Uuid, CommandResult> {
    if let Some(story_id) = requested {
        return if project.active_tdd_cycles.contains_key(&story_id) {
            Ok(story_id)
        } else {
            Err(CommandResult::err(format!("no active tdd cycle for story {story_id}"), None))
        };
    }

    let mut active: Vec<Uuid> = project.active_tdd_cycles.keys().copied().collect();
    match active.len() {
        0 => Err(CommandResult::err("no active tdd cycle", None)),
        1 => Ok(active.remove(0)),
        _ => {
            active.sort();
            Err(CommandResult::err(
                "multiple active tdd cycles; story_id required",
                Some(format!("active stories: {active:?}")),
            ))
        }
    }
}

/// Lowercases and replaces non-alphanumeric runs with underscores, matching
/// the convention-based path mappings [`DependencyTracker`] understands.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_sep = false;
    for ch in title.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    slug.trim_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{AgentResult, OrchestrationPolicy};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct MemStorage;

    #[async_trait]
    impl ProjectStorage for MemStorage {
        async fn load_project(&self, _name: &str) -> OrchardResult<Option<Project>> {
            Ok(None)
        }
        async fn save_project(&self, _project: &Project) -> OrchardResult<()> {
            Ok(())
        }
        async fn load_tdd_cycle(&self, _project_name: &str, _cycle_id: Uuid) -> OrchardResult<Option<TDDCycle>> {
            Ok(None)
        }
        async fn save_tdd_cycle(&self, _project_name: &str, _cycle: &TDDCycle) -> OrchardResult<()> {
            Ok(())
        }
        async fn list_tdd_cycle_ids(&self, _project_name: &str) -> OrchardResult<Vec<Uuid>> {
            Ok(vec![])
        }
    }

    struct OkAgent;

    #[async_trait]
    impl Agent for OkAgent {
        fn name(&self) -> &str {
            "ok"
        }
        fn capabilities(&self) -> HashSet<String> {
            HashSet::new()
        }
        async fn run(&self, _task: &Task, _dry_run: bool) -> OrchardResult<AgentResult> {
            Ok(AgentResult { ok: true, output: String::new(), error: None, artifacts: HashMap::new(), execution_time_ms: 0 })
        }
        async fn execute_tdd_phase(&self, _phase: TddState, _task: &Task) -> OrchardResult<AgentResult> {
            self.run(_task, false).await
        }
    }

    fn build_orchestrator(policy: OrchestrationPolicy) -> (Orchestrator, Uuid) {
        let mut project = Project::new("demo", "/tmp/demo".into(), policy);
        let story = crate::domain::models::Story::new("t", "d", 1);
        let story_id = story.id;
        project.stories.push(story);

        let mut agents: HashMap<AgentType, Arc<dyn Agent>> = HashMap::new();
        agents.insert(AgentType::Design, Arc::new(OkAgent));
        agents.insert(AgentType::Qa, Arc::new(OkAgent));
        agents.insert(AgentType::Code, Arc::new(OkAgent));

        (Orchestrator::new(vec![project], Arc::new(MemStorage), agents), story_id)
    }

    #[tokio::test]
    async fn unknown_project_returns_available_projects_hint() {
        let (orchestrator, _) = build_orchestrator(OrchestrationPolicy::Autonomous);
        let result = orchestrator.handle_command(Command::State, "missing").await;
        assert!(!result.ok);
        assert!(result.hint.unwrap().contains("demo"));
    }

    #[tokio::test]
    async fn tdd_start_respects_max_concurrent_cycles() {
        let (orchestrator, story_id) = build_orchestrator(OrchestrationPolicy::Autonomous);
        // Saturate the limit with distinct stories sharing one tdd cycle map slot each.
        for _ in 0..MAX_CONCURRENT_CYCLES {
            let handle = orchestrator.projects.get("demo").unwrap();
            let mut project = handle.project.lock().await;
            project.active_tdd_cycles.insert(Uuid::new_v4(), Uuid::new_v4());
        }
        let result = orchestrator
            .handle_command(Command::TddStart { story_id, task_description: None }, "demo")
            .await;
        assert!(!result.ok);
    }

    #[tokio::test]
    async fn blocking_policy_queues_approval_instead_of_running() {
        let (orchestrator, story_id) = build_orchestrator(OrchestrationPolicy::Blocking);
        orchestrator
            .handle_command(Command::TddStart { story_id, task_description: None }, "demo")
            .await;
        let handle = orchestrator.projects.get("demo").unwrap();
        let project = handle.project.lock().await;
        assert_eq!(project.pending_approval_ids.len(), 1);
    }

    #[tokio::test]
    async fn adding_a_story_from_idle_advances_to_backlog_ready() {
        let (orchestrator, _) = build_orchestrator(OrchestrationPolicy::Autonomous);
        let result = orchestrator
            .handle_command(
                Command::BacklogAddStory { title: None, description: "more tests".to_string(), epic_id: None, priority: 3 },
                "demo",
            )
            .await;
        assert!(result.ok);
        let handle = orchestrator.projects.get("demo").unwrap();
        let project = handle.project.lock().await;
        assert_eq!(project.scrum_state, ScrumState::BacklogReady);
        assert_eq!(project.stories.len(), 2);
    }

    #[tokio::test]
    async fn sprint_plan_then_start_activates_a_sprint() {
        let (orchestrator, story_id) = build_orchestrator(OrchestrationPolicy::Autonomous);
        {
            let handle = orchestrator.projects.get("demo").unwrap();
            let mut project = handle.project.lock().await;
            project.scrum_state = ScrumState::BacklogReady;
        }
        let plan_result = orchestrator.handle_command(Command::SprintPlan { story_ids: vec![story_id] }, "demo").await;
        assert!(plan_result.ok);

        let start_result = orchestrator.handle_command(Command::SprintStart, "demo").await;
        assert!(start_result.ok);

        let handle = orchestrator.projects.get("demo").unwrap();
        let project = handle.project.lock().await;
        assert_eq!(project.scrum_state, ScrumState::SprintActive);
        assert_eq!(project.active_sprint().unwrap().story_ids, vec![story_id]);
    }

    #[tokio::test]
    async fn sprint_plan_rejects_unknown_story_ids() {
        let (orchestrator, _) = build_orchestrator(OrchestrationPolicy::Autonomous);
        {
            let handle = orchestrator.projects.get("demo").unwrap();
            let mut project = handle.project.lock().await;
            project.scrum_state = ScrumState::BacklogReady;
        }
        let result = orchestrator
            .handle_command(Command::SprintPlan { story_ids: vec![Uuid::new_v4()] }, "demo")
            .await;
        assert!(!result.ok);
    }

    #[tokio::test]
    async fn tdd_start_rejects_a_second_cycle_on_the_same_story() {
        let (orchestrator, story_id) = build_orchestrator(OrchestrationPolicy::Autonomous);
        let first = orchestrator
            .handle_command(Command::TddStart { story_id, task_description: None }, "demo")
            .await;
        assert!(first.ok);

        let second = orchestrator
            .handle_command(Command::TddStart { story_id, task_description: None }, "demo")
            .await;
        assert!(!second.ok);
        assert!(second.error.unwrap().contains("already has an active tdd cycle"));
    }

    #[tokio::test]
    async fn tdd_next_with_explicit_story_id_advances_only_that_cycle() {
        let (orchestrator, story_a) = build_orchestrator(OrchestrationPolicy::Autonomous);
        let add_result = orchestrator
            .handle_command(
                Command::BacklogAddStory { title: None, description: "second".to_string(), epic_id: None, priority: 1 },
                "demo",
            )
            .await;
        let story_b: Uuid = add_result
            .payload
            .get("story_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap();

        orchestrator.handle_command(Command::TddStart { story_id: story_a, task_description: None }, "demo").await;
        orchestrator.handle_command(Command::TddStart { story_id: story_b, task_description: None }, "demo").await;

        let result = orchestrator.handle_command(Command::TddNext { story_id: Some(story_a) }, "demo").await;
        assert!(result.ok);

        let status_a = orchestrator.handle_command(Command::TddStatus { story_id: Some(story_a) }, "demo").await;
        let status_b = orchestrator.handle_command(Command::TddStatus { story_id: Some(story_b) }, "demo").await;
        assert_eq!(status_a.payload.get("state").and_then(|v| v.as_str()), Some("TEST_RED"));
        assert_eq!(status_b.payload.get("state").and_then(|v| v.as_str()), Some("DESIGN"));
    }

    #[tokio::test]
    async fn tdd_next_with_two_active_cycles_and_no_story_id_is_a_rejected_ambiguity() {
        let (orchestrator, story_a) = build_orchestrator(OrchestrationPolicy::Autonomous);
        let add_result = orchestrator
            .handle_command(
                Command::BacklogAddStory { title: None, description: "second".to_string(), epic_id: None, priority: 1 },
                "demo",
            )
            .await;
        let story_b: Uuid = add_result
            .payload
            .get("story_id")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap();

        orchestrator.handle_command(Command::TddStart { story_id: story_a, task_description: None }, "demo").await;
        orchestrator.handle_command(Command::TddStart { story_id: story_b, task_description: None }, "demo").await;

        let result = orchestrator.handle_command(Command::TddNext { story_id: None }, "demo").await;
        assert!(!result.ok);
        assert!(result.error.unwrap().contains("story_id required"));
    }
}
