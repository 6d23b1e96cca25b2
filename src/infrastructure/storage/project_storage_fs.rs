//! Filesystem-backed [`ProjectStorage`]: atomic write-temp/fsync/rename
//! snapshots under each project's `.orch-state/` directory.

use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::errors::OrchardResult;
use crate::domain::models::{Project, TDDCycle};
use crate::domain::ports::ProjectStorage;

pub struct FsProjectStorage {
    /// Maps project name to its `.orch-state/` directory.
    roots: std::collections::HashMap<String, PathBuf>,
}

impl FsProjectStorage {
    pub fn new(roots: std::collections::HashMap<String, PathBuf>) -> Self {
        Self { roots }
    }

    fn state_dir(&self, project_name: &str) -> OrchardResult<PathBuf> {
        self.roots
            .get(project_name)
            .cloned()
            .ok_or_else(|| crate::domain::errors::OrchardError::ProjectNotFound(project_name.to_string()))
    }

    fn status_path(&self, project_name: &str) -> OrchardResult<PathBuf> {
        Ok(self.state_dir(project_name)?.join("status.json"))
    }

    fn cycle_path(&self, project_name: &str, cycle_id: Uuid) -> OrchardResult<PathBuf> {
        Ok(self.state_dir(project_name)?.join("tdd_cycles").join(format!("{cycle_id}.json")))
    }
}

/// Writes `value` to `path` via a temp file in the same directory, fsync,
/// then atomic rename — never leaves a torn write visible at `path`.
fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> OrchardResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let mut file = std::fs::File::create(&tmp_path)?;
    let bytes = serde_json::to_vec_pretty(value)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> OrchardResult<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

#[async_trait]
impl ProjectStorage for FsProjectStorage {
    async fn load_project(&self, name: &str) -> OrchardResult<Option<Project>> {
        read_json(&self.status_path(name)?)
    }

    async fn save_project(&self, project: &Project) -> OrchardResult<()> {
        atomic_write_json(&self.status_path(&project.name)?, project)
    }

    async fn load_tdd_cycle(&self, project_name: &str, cycle_id: Uuid) -> OrchardResult<Option<TDDCycle>> {
        read_json(&self.cycle_path(project_name, cycle_id)?)
    }

    async fn save_tdd_cycle(&self, project_name: &str, cycle: &TDDCycle) -> OrchardResult<()> {
        atomic_write_json(&self.cycle_path(project_name, cycle.id)?, cycle)
    }

    async fn list_tdd_cycle_ids(&self, project_name: &str) -> OrchardResult<Vec<Uuid>> {
        let dir = self.state_dir(project_name)?.join("tdd_cycles");
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }
}
