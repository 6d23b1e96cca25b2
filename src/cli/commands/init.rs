//! Implementation of the `orchard init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Force reinitialization even if already initialized
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push("\nWrote .orch/config.yaml".to_string());
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Scaffolds `.orch/config.yaml` and each configured project's
/// `.orch-state/` tree.
pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir().context("failed to get current directory")?.join(&args.path)
    };

    let orch_dir = target_path.join(".orch");
    let state_dir = target_path.join(".orch-state");

    if orch_dir.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to reinitialize.".to_string(),
            initialized_path: target_path,
            directories_created: vec![],
            config_written: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    if args.force && orch_dir.exists() {
        fs::remove_dir_all(&orch_dir).await.context("failed to remove existing .orch directory")?;
    }

    let mut directories_created = vec![];

    let dirs = [orch_dir.clone(), state_dir.clone(), state_dir.join("tdd_cycles"), state_dir.join("logs"), state_dir.join("context_learning")];
    for dir in &dirs {
        if !dir.exists() {
            fs::create_dir_all(dir).await.with_context(|| format!("failed to create {dir:?}"))?;
            let relative = dir.strip_prefix(&target_path).unwrap_or(dir).to_string_lossy().to_string();
            directories_created.push(relative);
        }
    }

    let config_path = orch_dir.join("config.yaml");
    let config_written = if !config_path.exists() || args.force {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).context("failed to serialize default config")?;
        fs::write(&config_path, yaml).await.context("failed to write .orch/config.yaml")?;
        true
    } else {
        false
    };

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        directories_created,
        config_written,
    };

    output(&output_data, json_mode);
    Ok(())
}
