//! SQLite connection provider
//!
//! The repository itself never opens or closes connections; this is the
//! session provider callers use to hand borrowed handles into repository
//! operations.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::pool::{PoolConnection, PoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::Result;

/// DatabaseManager handles SQLite connection pooling
#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<Sqlite>,
    db_path: Arc<str>,
}

impl DatabaseManager {
    /// Creates a new DatabaseManager with a connection pool to the specified database
    #[instrument(err)]
    pub async fn new(db_path: &str) -> Result<Self> {
        info!("Initializing database at: {}", db_path);

        let pool = Pool::connect_with(
            SqliteConnectOptions::from_str(db_path)?
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                // NORMAL is safe under WAL and avoids a sync per transaction
                .synchronous(SqliteSynchronous::Normal),
        )
        .await?;

        Ok(Self {
            pool,
            db_path: db_path.into(),
        })
    }

    /// Open an in-memory database
    ///
    /// Pinned to a single connection: each SQLite `:memory:` connection is
    /// its own database, so a wider pool would hand out empty databases.
    pub async fn in_memory() -> Result<Self> {
        let pool = PoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(SqliteConnectOptions::from_str(":memory:")?)
            .await?;

        Ok(Self {
            pool,
            db_path: ":memory:".into(),
        })
    }

    /// Get database path
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Get the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Borrow a connection handle from the pool
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }
}
