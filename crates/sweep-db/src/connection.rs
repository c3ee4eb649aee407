//! Database connection management.
//!
//! Provides a `StorePool` wrapper around `SQLx` that opens (and creates, if
//! needed) the SQLite file the sweep state lives in.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// In-memory database marker accepted by [`StorePool::new`].
pub const IN_MEMORY: &str = ":memory:";

/// SQLite connection pool for the sweep store.
#[derive(Debug, Clone)]
pub struct StorePool {
    pool: Pool<Sqlite>,
}

impl StorePool {
    /// Open a connection pool on the given database file, creating it if needed.
    ///
    /// The parent directory is created when missing. `:memory:` opens a
    /// private in-memory database held on a single connection.
    ///
    /// # Errors
    /// Returns `DatabaseError` if:
    /// - The path is not valid UTF-8
    /// - The parent directory cannot be created
    /// - The database file cannot be opened
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect(path.as_ref(), true).await
    }

    /// Open a pool on a database file that must already exist.
    ///
    /// Nothing is created and the journal mode is left as it is, so
    /// inspecting a store does not change it.
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the file does not exist.
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect(path.as_ref(), false).await
    }

    async fn connect(path: &Path, create: bool) -> Result<Self> {
        let path_str = path.to_str().ok_or_else(|| {
            DatabaseError::Open("invalid database path: not valid UTF-8".to_string())
        })?;

        let mut connect_options = SqliteConnectOptions::from_str(path_str)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
            .create_if_missing(create)
            .busy_timeout(Duration::from_secs(5));

        let in_memory = path_str == IN_MEMORY;
        if create && !in_memory {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::Open(format!("failed to open {path_str}: {e}")))?;

        tracing::info!("Database pool opened at {}", path_str);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the connection pool gracefully.
    ///
    /// Waits for checked-out connections to be returned, so writes that are
    /// already executing complete before the file is released.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn answers(pool: &StorePool) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(pool.pool())
            .await
            .map(|one| one == 1)
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn test_in_memory_pool() {
        let pool = StorePool::new(IN_MEMORY).await.expect("open in-memory pool");
        assert!(answers(&pool).await);
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let path = tmp.path().join("state").join("nested").join("sweep.db");

        let pool = StorePool::new(&path).await.expect("open file pool");
        assert!(answers(&pool).await);
        assert!(path.exists());

        pool.close().await;
    }

    #[tokio::test]
    async fn test_open_existing_does_not_create() {
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let path = tmp.path().join("missing").join("sweep.db");

        let result = StorePool::open_existing(&path).await;

        assert!(matches!(result, Err(DatabaseError::Open(_))));
        assert!(!path.exists());
        assert!(!tmp.path().join("missing").exists());
    }

    #[tokio::test]
    async fn test_open_existing_reads_created_file() {
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let path = tmp.path().join("sweep.db");
        StorePool::new(&path).await.expect("create file").close().await;

        let pool = StorePool::open_existing(&path).await.expect("reopen file");
        assert!(answers(&pool).await);
        pool.close().await;
    }
}
