//! SQLite implementation of [`ContextStore`].
//!
//! Mutation is serialized per-path at the SQL layer via `INSERT OR
//! REPLACE`; reads are safe to run concurrently against the pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use crate::domain::errors::{OrchardError, OrchardResult};
use crate::domain::models::{DependencyEdge, FileNode, FileType};
use crate::domain::ports::ContextStore;
use crate::infrastructure::database::utils::parse_datetime;

pub struct ContextStoreRepo {
    pool: SqlitePool,
}

impl ContextStoreRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_node(row: &sqlx::sqlite::SqliteRow) -> OrchardResult<FileNode> {
        let file_type_str: String = row.get("file_type");
        let file_type = match file_type_str.as_str() {
            "source" => FileType::Source,
            "test" => FileType::Test,
            "markdown" => FileType::Markdown,
            "json" => FileType::Json,
            "yaml" => FileType::Yaml,
            "config" => FileType::Config,
            _ => FileType::Other,
        };

        let parse_list = |col: &str| -> OrchardResult<Vec<String>> {
            let raw: String = row.get(col);
            serde_json::from_str(&raw).map_err(|e| OrchardError::RowParse(e.to_string()))
        };
        let parse_set = |col: &str| -> OrchardResult<HashSet<String>> {
            let raw: String = row.get(col);
            serde_json::from_str(&raw).map_err(|e| OrchardError::RowParse(e.to_string()))
        };

        let modified_at_str: String = row.get("modified_at");
        let last_accessed_str: Option<String> = row.get("last_accessed");

        Ok(FileNode {
            path: row.get("path"),
            file_type,
            size: row.get::<i64, _>("size") as u64,
            modified_at: parse_datetime(&modified_at_str).map_err(|e| OrchardError::RowParse(e.to_string()))?,
            content_hash: row.get("content_hash"),
            imports: parse_list("imports")?,
            exports: parse_list("exports")?,
            classes: parse_list("classes")?,
            functions: parse_list("functions")?,
            forward_deps: parse_set("forward_deps")?,
            reverse_deps: parse_set("reverse_deps")?,
            access_count: row.get::<i64, _>("access_count") as u64,
            last_accessed: last_accessed_str
                .map(|s| parse_datetime(&s))
                .transpose()
                .map_err(|e| OrchardError::RowParse(e.to_string()))?,
        })
    }
}

#[async_trait]
impl ContextStore for ContextStoreRepo {
    async fn upsert_file(&self, node: &FileNode) -> OrchardResult<()> {
        let file_type = node.file_type.as_db_str();
        sqlx::query(
            "INSERT INTO files (path, file_type, size, modified_at, content_hash, imports, exports, classes, functions, forward_deps, reverse_deps, access_count, last_accessed)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                file_type = excluded.file_type, size = excluded.size, modified_at = excluded.modified_at,
                content_hash = excluded.content_hash, imports = excluded.imports, exports = excluded.exports,
                classes = excluded.classes, functions = excluded.functions, forward_deps = excluded.forward_deps,
                reverse_deps = excluded.reverse_deps",
        )
        .bind(&node.path)
        .bind(file_type)
        .bind(node.size as i64)
        .bind(node.modified_at.to_rfc3339())
        .bind(&node.content_hash)
        .bind(serde_json::to_string(&node.imports)?)
        .bind(serde_json::to_string(&node.exports)?)
        .bind(serde_json::to_string(&node.classes)?)
        .bind(serde_json::to_string(&node.functions)?)
        .bind(serde_json::to_string(&node.forward_deps)?)
        .bind(serde_json::to_string(&node.reverse_deps)?)
        .bind(node.access_count as i64)
        .bind(node.last_accessed.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_file(&self, path: &str) -> OrchardResult<Option<FileNode>> {
        let row = sqlx::query("SELECT * FROM files WHERE path = ?").bind(path).fetch_optional(&self.pool).await?;
        row.as_ref().map(Self::row_to_node).transpose()
    }

    async fn remove_file(&self, path: &str) -> OrchardResult<()> {
        sqlx::query("DELETE FROM files WHERE path = ?").bind(path).execute(&self.pool).await?;
        Ok(())
    }

    async fn all_files(&self) -> OrchardResult<Vec<FileNode>> {
        let rows = sqlx::query("SELECT * FROM files").fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_node).collect()
    }

    async fn replace_dependencies(&self, source: &str, edges: Vec<DependencyEdge>) -> OrchardResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM dependencies WHERE source = ?").bind(source).execute(&mut *tx).await?;
        for edge in edges {
            sqlx::query("INSERT OR IGNORE INTO dependencies (source, target, import_kind, line, strength) VALUES (?, ?, ?, ?, ?)")
                .bind(&edge.source)
                .bind(&edge.target)
                .bind(&edge.import_kind)
                .bind(edge.line)
                .bind(edge.strength)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn forward_dependencies(&self, path: &str) -> OrchardResult<Vec<DependencyEdge>> {
        let rows = sqlx::query("SELECT source, target, import_kind, line, strength FROM dependencies WHERE source = ?")
            .bind(path)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| DependencyEdge {
                source: r.get("source"),
                target: r.get("target"),
                import_kind: r.get("import_kind"),
                line: r.get::<i64, _>("line") as u32,
                strength: r.get("strength"),
            })
            .collect())
    }

    async fn reverse_dependencies(&self, path: &str) -> OrchardResult<Vec<DependencyEdge>> {
        let rows = sqlx::query("SELECT source, target, import_kind, line, strength FROM dependencies WHERE target = ?")
            .bind(path)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| DependencyEdge {
                source: r.get("source"),
                target: r.get("target"),
                import_kind: r.get("import_kind"),
                line: r.get::<i64, _>("line") as u32,
                strength: r.get("strength"),
            })
            .collect())
    }

    async fn last_scan_at(&self) -> OrchardResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT last_scan_at FROM scan_metadata WHERE id = 1").fetch_optional(&self.pool).await?;
        row.map(|r| {
            let raw: String = r.get("last_scan_at");
            parse_datetime(&raw).map_err(|e| OrchardError::RowParse(e.to_string()))
        })
        .transpose()
    }

    async fn record_scan(&self, at: DateTime<Utc>) -> OrchardResult<()> {
        sqlx::query("INSERT INTO scan_metadata (id, last_scan_at) VALUES (1, ?) ON CONFLICT(id) DO UPDATE SET last_scan_at = excluded.last_scan_at")
            .bind(at.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn track_access(&self, path: &str) -> OrchardResult<()> {
        sqlx::query("UPDATE files SET access_count = access_count + 1, last_accessed = ? WHERE path = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl FileType {
    fn as_db_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Test => "test",
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Config => "config",
            Self::Other => "other",
        }
    }
}
