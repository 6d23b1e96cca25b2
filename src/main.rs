//! Orchard CLI entry point

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use orchard::cli::commands::init;
use orchard::cli::output::{output, tree, CommandOutput};
use orchard::cli::{Cli, Commands};
use orchard::domain::models::{AgentType, Project, ScrumState};
use orchard::domain::ports::{Agent, BackgroundHandler, ContextStore, NullAgent, ProjectStorage};
use orchard::infrastructure::config::ConfigLoader;
use orchard::infrastructure::database::{ContextStoreRepo, DatabaseConnection};
use orchard::infrastructure::logging::{AuditLogger, LogConfig, LogFormat, LoggerImpl, RotationPolicy};
use orchard::infrastructure::storage::FsProjectStorage;
use orchard::services::{BackgroundScheduler, ContextIndex, DependencyTracker, Orchestrator};

/// Exit codes: 0 normal shutdown, 1 fatal init failure, 2
/// unrecoverable storage error.
const EXIT_INIT_FAILURE: i32 = 1;
const EXIT_STORAGE_FAILURE: i32 = 2;

#[derive(Debug, serde::Serialize)]
struct CommandResultOutput(orchard::domain::models::CommandResult);

impl CommandOutput for CommandResultOutput {
    fn to_human(&self) -> String {
        let result = &self.0;
        if result.ok {
            let mut lines = vec![result.message.clone().unwrap_or_default()];
            for (key, value) in &result.payload {
                lines.push(format!("  {key}: {value}"));
            }
            lines.join("\n")
        } else {
            let mut lines = vec![format!("error: {}", result.error.clone().unwrap_or_default())];
            if let Some(hint) = &result.hint {
                lines.push(format!("hint: {hint}"));
            }
            if let Some(allowed) = &result.allowed_commands {
                lines.push(format!("allowed commands: {}", allowed.join(", ")));
            }
            lines.join("\n")
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or_default()
    }
}

/// Wraps [`ContextIndex::build`] for the scheduler's `index_update`
/// background task type.
struct IndexUpdateHandler {
    index: Arc<ContextIndex>,
}

#[async_trait::async_trait]
impl BackgroundHandler for IndexUpdateHandler {
    fn task_type(&self) -> &'static str {
        "index_update"
    }

    async fn handle(
        &self,
        _task: &orchard::domain::models::BackgroundTask,
        _cancelled: &std::sync::atomic::AtomicBool,
    ) -> orchard::domain::errors::OrchardResult<serde_json::Value> {
        let indexed = self.index.build(false).await?;
        Ok(serde_json::json!({ "indexed": indexed }))
    }
}

/// Parses a [`ScrumState`]'s [`Display`](std::fmt::Display) form back,
/// for rendering `/state --diagram` from the command result's
/// `current_state` string.
fn parse_scrum_state(s: &str) -> Option<ScrumState> {
    [
        ScrumState::Idle,
        ScrumState::BacklogReady,
        ScrumState::SprintPlanned,
        ScrumState::SprintActive,
        ScrumState::SprintPaused,
        ScrumState::SprintReview,
        ScrumState::Blocked,
    ]
    .into_iter()
    .find(|state| state.to_string() == s)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init { force, ref path } = cli.command {
        init::execute(init::InitArgs { force, path: path.clone() }, cli.json).await?;
        return Ok(());
    }

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(EXIT_INIT_FAILURE);
        }
    };

    let log_format = if config.logging.format.eq_ignore_ascii_case("json") { LogFormat::Json } else { LogFormat::Pretty };
    let log_config = LogConfig {
        level: config.logging.level.clone(),
        format: log_format,
        log_dir: Some(PathBuf::from(&config.logging.directory)),
        enable_stdout: true,
        rotation: RotationPolicy::Daily,
        retention_days: 30,
    };
    let _logger_guard = LoggerImpl::init(&log_config).context("failed to initialize logger")?;
    let audit_log_path = PathBuf::from(&config.logging.directory).join("audit.log");
    let audit_logger = AuditLogger::new(&audit_log_path).await.context("failed to open audit log")?;

    let database_url = format!("sqlite:{}", config.database.path);
    let db = match DatabaseConnection::new(&database_url, config.database.max_connections).await {
        Ok(db) => db,
        Err(err) => {
            error!(error = %err, "failed to open context index database");
            std::process::exit(EXIT_STORAGE_FAILURE);
        }
    };
    if let Err(err) = db.migrate().await {
        error!(error = %err, "failed to run database migrations");
        std::process::exit(EXIT_STORAGE_FAILURE);
    }

    let mut roots = HashMap::new();
    let mut projects = Vec::new();
    for project_config in &config.projects {
        let state_dir = project_config.path.join(".orch-state");
        roots.insert(project_config.name.clone(), state_dir);
        projects.push(Project::new(project_config.name.clone(), project_config.path.clone(), project_config.orchestration));
    }
    let storage: Arc<dyn ProjectStorage> = Arc::new(FsProjectStorage::new(roots));

    let mut loaded_projects = Vec::new();
    for project in projects {
        match storage.load_project(&project.name).await {
            Ok(Some(persisted)) => loaded_projects.push(persisted),
            Ok(None) => loaded_projects.push(project),
            Err(err) => {
                error!(error = %err, project = %project.name, "failed to load persisted project snapshot");
                std::process::exit(EXIT_STORAGE_FAILURE);
            }
        }
    }

    let mut agents: HashMap<AgentType, Arc<dyn Agent>> = HashMap::new();
    for agent_type in [AgentType::Design, AgentType::Qa, AgentType::Code, AgentType::Data] {
        agents.insert(agent_type, Arc::new(NullAgent::new()));
    }

    let context_store: Arc<dyn ContextStore> = Arc::new(ContextStoreRepo::new(db.pool().clone()));
    let mut handlers: Vec<Arc<dyn BackgroundHandler>> = Vec::new();
    let mut context_index = None;
    let mut dependency_tracker = None;
    if let Some(project_config) = config.projects.first() {
        let index = Arc::new(ContextIndex::new(context_store.clone(), project_config.path.clone(), ".orch-state"));
        handlers.push(Arc::new(IndexUpdateHandler { index: index.clone() }));
        context_index = Some(index);
        dependency_tracker = Some(Arc::new(DependencyTracker::new(context_store.clone(), project_config.path.clone())));
    }
    let scheduler = Arc::new(BackgroundScheduler::new(handlers, config.scheduler.max_queue_depth));

    let mut orchestrator = Orchestrator::new(loaded_projects, storage.clone(), agents).with_scheduler(scheduler.clone());
    if let Some(index) = context_index {
        orchestrator = orchestrator.with_context_index(index);
    }
    if let Some(tracker) = dependency_tracker {
        orchestrator = orchestrator.with_dependency_tracker(tracker);
    }
    let orchestrator = Arc::new(orchestrator);

    for _ in 0..config.scheduler.worker_count {
        let scheduler = scheduler.clone();
        let poll_interval = Duration::from_millis(config.scheduler.poll_interval_ms);
        tokio::spawn(async move {
            loop {
                match scheduler.run_worker().await {
                    Ok(true) => {}
                    Ok(false) => tokio::time::sleep(poll_interval).await,
                    Err(err) => warn!(error = %err, "background worker error"),
                }
            }
        });
    }

    {
        let orchestrator = orchestrator.clone();
        let interval = Duration::from_secs(config.reconciliation_interval_secs);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                orchestrator.reconcile_once().await;
            }
        });
    }

    let Some(command) = cli.command.to_domain() else {
        unreachable!("Init is handled before this point");
    };
    let wants_diagram = cli.command.wants_diagram();
    let command_label = format!("{command:?}");

    let result = orchestrator.handle_command(command, &cli.project).await;
    if wants_diagram {
        let state = result
            .payload
            .get("scrum_state")
            .and_then(|v| v.as_str())
            .or(result.current_state.as_deref())
            .and_then(parse_scrum_state);
        if let Some(state) = state {
            println!("{}", tree::render_scrum_diagram(state));
        }
    }

    let ok = result.ok;
    if let Err(err) = audit_logger
        .log_operation(&command_label, &cli.project, None, ok, Some(serde_json::json!({ "json_mode": cli.json })))
        .await
    {
        warn!(error = %err, "failed to write audit log entry");
    }
    output(&CommandResultOutput(result), cli.json);

    info!(project = %cli.project, ok, "command completed");
    db.close().await;

    std::process::exit(if ok { 0 } else { EXIT_INIT_FAILURE });
}
