//! Root configuration type, loaded by
//! [`crate::infrastructure::config::ConfigLoader`] via figment.
//!
//! A single top-level config file declares the managed projects plus
//! optional scheduler/watcher/context-index tuning. Missing
//! config falls back to a single `default` project rooted at `.`.

use serde::{Deserialize, Serialize};

use super::scrum::OrchestrationPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    pub path: std::path::PathBuf,
    #[serde(default)]
    pub orchestration: OrchestrationPolicy,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            path: ".".into(),
            orchestration: OrchestrationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub worker_count: usize,
    pub poll_interval_ms: u64,
    pub max_queue_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            poll_interval_ms: 500,
            max_queue_depth: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextIndexConfig {
    pub min_score_threshold: f64,
    pub max_files: usize,
    pub cache_ttl_secs: u64,
    pub max_file_size_bytes: u64,
}

impl Default for ContextIndexConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 0.1,
            max_files: 25,
            cache_ttl_secs: 300,
            max_file_size_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: ".orch-state/context_index.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: ".orch-state/logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_projects")]
    pub projects: Vec<ProjectConfig>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub context_index: ContextIndexConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_concurrent_cycles")]
    pub max_concurrent_cycles: usize,
    #[serde(default = "default_reconciliation_interval_secs")]
    pub reconciliation_interval_secs: u64,
}

fn default_projects() -> Vec<ProjectConfig> {
    vec![ProjectConfig::default()]
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_max_concurrent_cycles() -> usize {
    3
}

const fn default_reconciliation_interval_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            projects: default_projects(),
            scheduler: SchedulerConfig::default(),
            watcher: WatcherConfig::default(),
            context_index: ContextIndexConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            max_retries: default_max_retries(),
            max_concurrent_cycles: default_max_concurrent_cycles(),
            reconciliation_interval_secs: default_reconciliation_interval_secs(),
        }
    }
}
