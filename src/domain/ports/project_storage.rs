//! Project snapshot persistence port.
//!
//! Backed in production by an atomic write-temp/fsync/rename filesystem
//! store under `.orch-state/`; swappable for
//! an in-memory store in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::OrchardResult;
use crate::domain::models::{Project, TDDCycle};

#[async_trait]
pub trait ProjectStorage: Send + Sync {
    /// Load a project's `status.json` snapshot, if it has ever been saved.
    async fn load_project(&self, name: &str) -> OrchardResult<Option<Project>>;

    /// Atomically persist the project snapshot (write-temp, fsync, rename).
    async fn save_project(&self, project: &Project) -> OrchardResult<()>;

    async fn load_tdd_cycle(&self, project_name: &str, cycle_id: Uuid) -> OrchardResult<Option<TDDCycle>>;

    async fn save_tdd_cycle(&self, project_name: &str, cycle: &TDDCycle) -> OrchardResult<()>;

    /// All cycle ids ever persisted for a project, regardless of terminal
    /// status, for reconciliation-loop scans.
    async fn list_tdd_cycle_ids(&self, project_name: &str) -> OrchardResult<Vec<Uuid>>;
}
