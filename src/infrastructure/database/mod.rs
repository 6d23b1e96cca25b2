//! Database infrastructure
//!
//! SQLite database implementation using sqlx with:
//! - Context index repository adapter
//! - Database migrations
//! - Connection pool management
//! - WAL mode configuration

pub mod connection;
pub mod context_store_repo;
pub mod utils;

pub use connection::DatabaseConnection;
pub use context_store_repo::ContextStoreRepo;
