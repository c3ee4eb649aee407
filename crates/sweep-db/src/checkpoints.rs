//! Append-only checkpoint log.
//!
//! Every processed candidate gets a new timestamped row. Rows are never
//! updated or deleted; the newest row is the resume position and the rest is
//! history kept for audit.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

/// One row of the checkpoint log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// Insertion order, used to break timestamp ties
    pub id: i64,
    /// Rendered candidate that was processed
    pub candidate_id: String,
    /// When the candidate finished processing
    pub checked_at: DateTime<Utc>,
}

/// Append a checkpoint for `candidate_id` stamped with the current time.
pub async fn append_checkpoint(pool: &SqlitePool, candidate_id: &str) -> Result<()> {
    let checked_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

    let result = sqlx::query("INSERT INTO checkpoints (candidate_id, checked_at) VALUES (?, ?)")
        .bind(candidate_id)
        .bind(&checked_at)
        .execute(pool)
        .await?;

    if result.rows_affected() != 1 {
        return Err(DatabaseError::Query(format!(
            "checkpoint for '{candidate_id}' was not written"
        )));
    }

    Ok(())
}

/// Candidate id of the most recent checkpoint, if any.
pub async fn last_checkpoint(pool: &SqlitePool) -> Result<Option<String>> {
    let candidate_id = sqlx::query_scalar::<_, String>(
        r"
        SELECT candidate_id
        FROM checkpoints
        ORDER BY checked_at DESC, id DESC
        LIMIT 1
        ",
    )
    .fetch_optional(pool)
    .await?;

    Ok(candidate_id)
}

/// The newest `limit` checkpoints, newest first.
pub async fn list_checkpoints(pool: &SqlitePool, limit: u32) -> Result<Vec<CheckpointRecord>> {
    let rows = sqlx::query_as::<_, (i64, String, String)>(
        r"
        SELECT id, candidate_id, checked_at
        FROM checkpoints
        ORDER BY checked_at DESC, id DESC
        LIMIT ?
        ",
    )
    .bind(i64::from(limit))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, candidate_id, checked_at)| {
            let parsed = DateTime::parse_from_rfc3339(&checked_at).map_err(|e| {
                DatabaseError::Decode(format!("invalid checked_at '{checked_at}': {e}"))
            })?;
            Ok(CheckpointRecord {
                id,
                candidate_id,
                checked_at: parsed.with_timezone(&Utc),
            })
        })
        .collect()
}

/// Total number of checkpoint rows.
pub async fn count_checkpoints(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM checkpoints")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_test_db() -> Database {
        let db = Database::open(crate::connection::IN_MEMORY)
            .await
            .expect("open test database");
        db.initialize().await.expect("initialize schema");
        db
    }

    #[tokio::test]
    async fn test_empty_log_has_no_checkpoint() {
        let db = setup_test_db().await;
        assert_eq!(last_checkpoint(db.pool()).await.expect("query"), None);
        assert_eq!(count_checkpoints(db.pool()).await.expect("count"), 0);
    }

    #[tokio::test]
    async fn test_latest_checkpoint_wins() {
        let db = setup_test_db().await;
        for id in ["A100000", "A100001", "A100002"] {
            append_checkpoint(db.pool(), id).await.expect("append");
        }

        assert_eq!(
            last_checkpoint(db.pool()).await.expect("query"),
            Some("A100002".to_string())
        );
        assert_eq!(count_checkpoints(db.pool()).await.expect("count"), 3);
    }

    #[tokio::test]
    async fn test_timestamp_tie_broken_by_insertion_order() {
        let db = setup_test_db().await;
        let stamp = "2026-01-01T00:00:00.000000Z";
        for id in ["A100005", "A100006"] {
            sqlx::query("INSERT INTO checkpoints (candidate_id, checked_at) VALUES (?, ?)")
                .bind(id)
                .bind(stamp)
                .execute(db.pool())
                .await
                .expect("insert checkpoint");
        }

        assert_eq!(
            last_checkpoint(db.pool()).await.expect("query"),
            Some("A100006".to_string())
        );
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_keeps_history() {
        let db = setup_test_db().await;
        for id in ["A1", "A2", "A3", "A4"] {
            append_checkpoint(db.pool(), id).await.expect("append");
        }

        let listed = list_checkpoints(db.pool(), 3).await.expect("list");
        let ids: Vec<_> = listed.iter().map(|c| c.candidate_id.as_str()).collect();
        assert_eq!(ids, vec!["A4", "A3", "A2"]);
        assert!(listed[0].checked_at >= listed[1].checked_at);
    }
}
