//! Schema migrations for the sweep store.
//!
//! The SQL files under `migrations/` are embedded at compile time. Applied
//! versions are tracked by `SQLx` in `_sqlx_migrations`.

use crate::error::{DatabaseError, Result};
use sqlx::migrate::Migrator;
use sqlx::{Pool, Sqlite};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply every embedded migration that has not run yet.
///
/// # Errors
/// Returns `DatabaseError::Migration` if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    tracing::debug!(version = latest_schema_version(), "Schema up to date");
    Ok(())
}

/// Version of the newest migration embedded in this build.
#[must_use]
pub fn latest_schema_version() -> i64 {
    MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Highest successfully applied migration, or 0 for a store that was never
/// initialized. Never modifies the store.
pub async fn applied_schema_version(pool: &Pool<Sqlite>) -> Result<i64> {
    let tracked: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    if !tracked {
        return Ok(0);
    }

    let version: Option<i64> =
        sqlx::query_scalar("SELECT MAX(version) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{StorePool, IN_MEMORY};

    #[test]
    fn test_latest_version_matches_files() {
        assert_eq!(latest_schema_version(), 2);
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = StorePool::new(IN_MEMORY).await.expect("open pool");
        assert_eq!(applied_schema_version(pool.pool()).await.expect("version"), 0);

        run_migrations(pool.pool()).await.expect("run migrations");

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(pool.pool())
        .await
        .expect("query tables");

        assert_eq!(tables, vec!["checkpoints", "discovered_records"]);
        assert_eq!(
            applied_schema_version(pool.pool()).await.expect("version"),
            latest_schema_version()
        );
    }

    #[tokio::test]
    async fn test_migrations_rerun_is_noop() {
        let pool = StorePool::new(IN_MEMORY).await.expect("open pool");

        run_migrations(pool.pool()).await.expect("first run");
        run_migrations(pool.pool()).await.expect("second run");

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
            .fetch_one(pool.pool())
            .await
            .expect("count migrations");
        assert_eq!(applied, 2);
    }
}
