//! Repository factory
//!
//! Centralizes construction of repositories so they all share the same
//! database manager and connection pool.

use sqlx::pool::PoolConnection;
use sqlx::{Pool, Sqlite};

use crate::db::DatabaseManager;
use crate::entity::Entity;
use crate::error::Result;
use crate::repository::SqliteRepository;

/// Repository factory for creating repositories
#[derive(Clone)]
pub struct RepositoryFactory {
    db: DatabaseManager,
}

impl RepositoryFactory {
    /// Create a new repository factory
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    /// Get the database connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        self.db.pool()
    }

    /// Borrow a connection handle for repository calls
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.db.acquire().await
    }

    /// Create a repository for an entity type
    pub fn repository<T: Entity>(&self) -> SqliteRepository<T> {
        SqliteRepository::new()
    }
}
