//! SQLite connection pool manager, WAL mode enabled for concurrent reads.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

/// Manages the `SQLite` connection pool backing the context index
/// (`context_index.db`).
pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Opens (creating if missing) the database at `database_url`, e.g.
    /// `sqlite:.orch-state/context_index.db` or `sqlite::memory:`.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .context("failed to create connection pool")?;

        Ok(Self { pool })
    }

    /// Applies all pending migrations from `./migrations`. Safe to call
    /// repeatedly.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.context("failed to run migrations")?;
        Ok(())
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_pool_opens_and_closes() {
        let db = DatabaseConnection::new("sqlite::memory:", 5).await.unwrap();
        assert!(!db.pool().is_closed());
        db.close().await;
    }

    #[tokio::test]
    async fn migrations_create_files_table() {
        let db = DatabaseConnection::new("sqlite::memory:", 5).await.unwrap();
        db.migrate().await.unwrap();
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='files'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(result.0, 1);
        db.close().await;
    }
}
