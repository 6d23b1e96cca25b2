//! Context index persistence port.
//!
//! Backed in production by a SQLite (sqlx, WAL mode) store with `files` and
//! `dependencies` tables plus a scan-metadata table. Kept
//! independent of [`crate::services::context_filter`], which only consumes
//! [`crate::domain::models::file_index::RelevanceSignals`].

use async_trait::async_trait;

use crate::domain::errors::OrchardResult;
use crate::domain::models::{DependencyEdge, FileNode};

#[async_trait]
pub trait ContextStore: Send + Sync {
    async fn upsert_file(&self, node: &FileNode) -> OrchardResult<()>;

    async fn get_file(&self, path: &str) -> OrchardResult<Option<FileNode>>;

    async fn remove_file(&self, path: &str) -> OrchardResult<()>;

    async fn all_files(&self) -> OrchardResult<Vec<FileNode>>;

    async fn replace_dependencies(&self, source: &str, edges: Vec<DependencyEdge>) -> OrchardResult<()>;

    async fn forward_dependencies(&self, path: &str) -> OrchardResult<Vec<DependencyEdge>>;

    async fn reverse_dependencies(&self, path: &str) -> OrchardResult<Vec<DependencyEdge>>;

    async fn last_scan_at(&self) -> OrchardResult<Option<chrono::DateTime<chrono::Utc>>>;

    async fn record_scan(&self, at: chrono::DateTime<chrono::Utc>) -> OrchardResult<()>;

    async fn track_access(&self, path: &str) -> OrchardResult<()>;
}
