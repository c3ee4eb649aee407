//! Sweep Database Layer
//!
//! Durable state for a sweep: the table of discovered records and the
//! append-only checkpoint log that defines where a restarted sweep resumes.
//!
//! # Example
//!
//! ```ignore
//! use sweep_db::Database;
//!
//! let db = Database::open("permit-sweep.db").await?;
//! db.initialize().await?;
//! let resume_from = db.last_checkpoint().await?;
//! ```
//!
//! # Design Principles
//!
//! - Schema lives in embedded `SQLx` migrations, applied on every startup
//! - Records are upserted by permit number, never merged
//! - Checkpoints are only ever inserted; the newest row is the resume point

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod checkpoints;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod records;

// Re-export commonly used types
pub use checkpoints::CheckpointRecord;
pub use connection::{StorePool, IN_MEMORY};
pub use error::{DatabaseError, Result};
pub use records::DiscoveredRecord;

use std::path::Path;

/// High-level handle on the sweep store.
///
/// Wraps a `StorePool` and exposes the record and checkpoint operations the
/// pipeline needs.
#[derive(Debug)]
pub struct Database {
    pool: StorePool,
}

impl Database {
    /// Open (or create) the database at `path`.
    ///
    /// The schema is not touched; call [`Database::initialize`] next.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for in-memory)
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let pool = StorePool::new(path).await?;
        Ok(Self { pool })
    }

    /// Open an existing database without creating or migrating it.
    ///
    /// Used for read-only inspection; check [`Database::is_initialized`]
    /// before querying.
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let pool = StorePool::open_existing(path).await?;
        Ok(Self { pool })
    }

    /// Create the records table and checkpoint log if absent.
    ///
    /// Safe to call on every startup.
    pub async fn initialize(&self) -> Result<()> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Highest applied migration, 0 before [`Database::initialize`].
    pub async fn schema_version(&self) -> Result<i64> {
        migrations::applied_schema_version(self.pool.pool()).await
    }

    /// Whether every embedded migration has been applied.
    pub async fn is_initialized(&self) -> Result<bool> {
        Ok(self.schema_version().await? >= migrations::latest_schema_version())
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }

    /// Insert or replace a record keyed by its permit number.
    pub async fn upsert_record(&self, record: &DiscoveredRecord) -> Result<()> {
        records::upsert_record(self.pool(), record).await
    }

    /// Look up a stored record.
    pub async fn get_record(&self, permit_number: &str) -> Result<Option<DiscoveredRecord>> {
        records::get_record(self.pool(), permit_number).await
    }

    /// Number of stored records.
    pub async fn count_records(&self) -> Result<i64> {
        records::count_records(self.pool()).await
    }

    /// Append a checkpoint row for a processed candidate.
    pub async fn append_checkpoint(&self, candidate_id: &str) -> Result<()> {
        checkpoints::append_checkpoint(self.pool(), candidate_id).await
    }

    /// The most recently checkpointed candidate id, if any.
    pub async fn last_checkpoint(&self) -> Result<Option<String>> {
        checkpoints::last_checkpoint(self.pool()).await
    }

    /// The newest `limit` checkpoint rows, newest first.
    pub async fn list_checkpoints(&self, limit: u32) -> Result<Vec<CheckpointRecord>> {
        checkpoints::list_checkpoints(self.pool(), limit).await
    }

    /// Number of checkpoint rows, history included.
    pub async fn count_checkpoints(&self) -> Result<i64> {
        checkpoints::count_checkpoints(self.pool()).await
    }

    /// Close the database.
    ///
    /// In-flight statements finish before the connections are released.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_initialize() {
        let db = Database::open(IN_MEMORY).await.expect("open database");

        assert_eq!(db.schema_version().await.expect("get version"), 0);
        assert!(!db.is_initialized().await.expect("check schema"));
        db.initialize().await.expect("initialize");
        assert_eq!(db.schema_version().await.expect("get version"), 2);
        assert!(db.is_initialized().await.expect("check schema"));
    }

    #[tokio::test]
    async fn test_initialize_twice() {
        let db = Database::open(IN_MEMORY).await.expect("open database");
        db.initialize().await.expect("first initialize");
        db.initialize().await.expect("second initialize");
    }

    #[tokio::test]
    async fn test_database_schema() {
        let db = Database::open(IN_MEMORY).await.expect("open database");
        db.initialize().await.expect("initialize");

        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM pragma_table_info('discovered_records') ORDER BY cid",
        )
        .fetch_all(db.pool())
        .await
        .expect("query columns");

        assert_eq!(
            columns,
            vec![
                "permit_number",
                "external_id",
                "name",
                "company",
                "address",
                "phone",
                "source_url",
                "created_at"
            ]
        );
    }

    #[tokio::test]
    async fn test_database_close() {
        let db = Database::open(IN_MEMORY).await.expect("open database");
        db.close().await; // Should not panic
    }
}
