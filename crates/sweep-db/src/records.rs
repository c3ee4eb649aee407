//! Discovered record storage.
//!
//! One row per permit number. Writes are upserts: a later discovery of the
//! same permit number replaces every column, creation timestamp included.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// A record extracted from a detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredRecord {
    /// Unique key of the record
    pub permit_number: String,
    /// Identifier the remote service uses in its detail links
    pub external_id: String,
    /// Display name
    pub name: String,
    /// Company or firm
    pub company: String,
    /// Postal address
    pub address: String,
    /// Phone number
    pub phone: String,
    /// Detail page the fields were read from
    pub source_url: String,
    /// When this version of the row was written
    pub created_at: DateTime<Utc>,
}

/// Insert or fully replace the record keyed by `permit_number`.
pub async fn upsert_record(pool: &SqlitePool, record: &DiscoveredRecord) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO discovered_records
            (permit_number, external_id, name, company, address, phone, source_url, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(permit_number) DO UPDATE SET
            external_id = excluded.external_id,
            name = excluded.name,
            company = excluded.company,
            address = excluded.address,
            phone = excluded.phone,
            source_url = excluded.source_url,
            created_at = excluded.created_at
        ",
    )
    .bind(&record.permit_number)
    .bind(&record.external_id)
    .bind(&record.name)
    .bind(&record.company)
    .bind(&record.address)
    .bind(&record.phone)
    .bind(&record.source_url)
    .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true))
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a record by permit number.
pub async fn get_record(pool: &SqlitePool, permit_number: &str) -> Result<Option<DiscoveredRecord>> {
    let row = sqlx::query(
        r"
        SELECT permit_number, external_id, name, company, address, phone, source_url, created_at
        FROM discovered_records
        WHERE permit_number = ?
        ",
    )
    .bind(permit_number)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| DatabaseError::Decode(format!("invalid created_at '{created_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(Some(DiscoveredRecord {
        permit_number: row.try_get("permit_number")?,
        external_id: row.try_get("external_id")?,
        name: row.try_get("name")?,
        company: row.try_get("company")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        source_url: row.try_get("source_url")?,
        created_at,
    }))
}

/// Number of distinct records stored.
pub async fn count_records(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM discovered_records")
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

    fn record(permit: &str, name: &str) -> DiscoveredRecord {
        DiscoveredRecord {
            permit_number: permit.to_string(),
            external_id: "ext-1".to_string(),
            name: name.to_string(),
            company: "Tremblay & Associates".to_string(),
            address: "1 Rue Principale".to_string(),
            phone: "514-555-0100".to_string(),
            source_url: "https://example.com/detail?id=ext-1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = setup_test_db().await;
        let original = record("A100001", "Marie Tremblay");

        upsert_record(db.pool(), &original).await.expect("upsert");

        let stored = get_record(db.pool(), "A100001")
            .await
            .expect("get record")
            .expect("record exists");
        assert_eq!(stored.name, "Marie Tremblay");
        assert_eq!(stored.company, original.company);
        assert_eq!(
            stored.created_at.timestamp_micros(),
            original.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_whole_row() {
        let db = setup_test_db().await;
        upsert_record(db.pool(), &record("A100001", "Old Name"))
            .await
            .expect("first upsert");

        let mut newer = record("A100001", "New Name");
        newer.phone = String::new();
        newer.created_at += chrono::Duration::seconds(5);
        upsert_record(db.pool(), &newer).await.expect("second upsert");

        assert_eq!(count_records(db.pool()).await.expect("count"), 1);
        let stored = get_record(db.pool(), "A100001")
            .await
            .expect("get record")
            .expect("record exists");
        assert_eq!(stored.name, "New Name");
        assert_eq!(stored.phone, "");
        assert_eq!(
            stored.created_at.timestamp_micros(),
            newer.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_get_missing_record() {
        let db = setup_test_db().await;
        let result = get_record(db.pool(), "A999999").await.expect("query");
        assert!(result.is_none());
    }
}
