use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("projects list cannot be empty")]
    NoProjects,

    #[error("project name cannot be empty")]
    EmptyProjectName,

    #[error("Invalid scheduler.worker_count: {0}. Must be at least 1")]
    InvalidWorkerCount(usize),

    #[error("Invalid scheduler.max_queue_depth: {0}. Must be at least 1")]
    InvalidQueueDepth(usize),

    #[error("Invalid context_index.min_score_threshold: {0}. Must be in [0.0, 1.0]")]
    InvalidScoreThreshold(f64),

    #[error("Invalid context_index.max_files: {0}. Must be at least 1")]
    InvalidMaxFiles(usize),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid database.max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid max_retries: {0}. Cannot be 0")]
    InvalidMaxRetries(u32),

    #[error("Invalid max_concurrent_cycles: {0}. Cannot be 0")]
    InvalidMaxConcurrentCycles(usize),

    #[error("Invalid reconciliation_interval_secs: {0}. Cannot be 0")]
    InvalidReconciliationInterval(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .orch/config.yaml (project config, created by init)
    /// 3. .orch/local.yaml (project local overrides, optional)
    /// 4. Environment variables (ORCHARD_* prefix, highest priority)
    ///
    /// Note: Configuration is always project-local (pwd/.orch/) to
    /// support multiple swarms per machine with different projects.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".orch/config.yaml"))
            .merge(Yaml::file(".orch/local.yaml"))
            .merge(Env::prefixed("ORCHARD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.projects.is_empty() {
            return Err(ConfigError::NoProjects);
        }
        for project in &config.projects {
            if project.name.is_empty() {
                return Err(ConfigError::EmptyProjectName);
            }
        }

        if config.scheduler.worker_count == 0 {
            return Err(ConfigError::InvalidWorkerCount(config.scheduler.worker_count));
        }
        if config.scheduler.max_queue_depth == 0 {
            return Err(ConfigError::InvalidQueueDepth(config.scheduler.max_queue_depth));
        }

        if !(0.0..=1.0).contains(&config.context_index.min_score_threshold) {
            return Err(ConfigError::InvalidScoreThreshold(
                config.context_index.min_score_threshold,
            ));
        }
        if config.context_index.max_files == 0 {
            return Err(ConfigError::InvalidMaxFiles(config.context_index.max_files));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.max_retries));
        }
        if config.max_concurrent_cycles == 0 {
            return Err(ConfigError::InvalidMaxConcurrentCycles(
                config.max_concurrent_cycles,
            ));
        }
        if config.reconciliation_interval_secs == 0 {
            return Err(ConfigError::InvalidReconciliationInterval(
                config.reconciliation_interval_secs,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn default_config_validates() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn empty_projects_list_is_rejected() {
        let mut config = Config::default();
        config.projects.clear();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::NoProjects)
        ));
    }

    #[test]
    fn zero_worker_count_is_rejected() {
        let mut config = Config::default();
        config.scheduler.worker_count = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn score_threshold_out_of_range_is_rejected() {
        let mut config = Config::default();
        config.context_index.min_score_threshold = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidScoreThreshold(_))
        ));
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "verbose"),
            other => panic!("expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn empty_database_path_is_rejected() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyDatabasePath)
        ));
    }

    #[test]
    fn zero_max_retries_is_rejected() {
        let mut config = Config::default();
        config.max_retries = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxRetries(0))
        ));
    }

    #[test]
    fn env_var_naming_uses_orchard_prefix() {
        unsafe {
            env::set_var("ORCHARD_MAX_RETRIES", "7");
        }
        assert_eq!(env::var("ORCHARD_MAX_RETRIES").unwrap(), "7");
        unsafe {
            env::remove_var("ORCHARD_MAX_RETRIES");
        }
    }

    #[test]
    fn hierarchical_merging_prefers_override_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "max_retries: 5\nlogging:\n  level: info").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "max_retries: 9").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.max_retries, 9, "override should win");
        assert_eq!(
            config.logging.level, "info",
            "base value should persist when not overridden"
        );
    }
}
