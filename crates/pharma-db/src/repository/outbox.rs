//! # Sync Outbox Repository
//!
//! Remote writes that could not be delivered when they happened.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL WRITE (e.g. create_bill)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cache updated ──► POST to endpoint                                     │
//! │                        │                                                │
//! │                        ├── ok    → done                                 │
//! │                        └── fails → enqueue(action, payload)             │
//! │                                                                         │
//! │  flush_outbox (pharma-sync)                                             │
//! │  1. pending(limit)           oldest first, by seq                       │
//! │  2. For each entry:                                                     │
//! │     a. Replay the request                                               │
//! │     b. On success: mark_synced                                          │
//! │     c. On failure: mark_failed, stop (order matters)                    │
//! │                                                                         │
//! │  An entry that has failed MAX times becomes `failed` and is skipped.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Delivery state of an outbox entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Synced,
    /// Gave up after too many attempts.
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Synced => "synced",
            OutboxStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for OutboxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutboxStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OutboxStatus::Pending),
            "synced" => Ok(OutboxStatus::Synced),
            "failed" => Ok(OutboxStatus::Failed),
            other => Err(DbError::Corrupt(format!("unknown outbox status '{}'", other))),
        }
    }
}

/// One undelivered remote write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxEntry {
    /// Insertion order.
    pub seq: i64,
    pub id: String,
    /// Remote action name (`saveBill`, `updateMedicine`, ...).
    pub action: String,
    /// Local id of the entity the write is about, when there is one.
    pub entity_id: Option<String>,
    /// The request body, as JSON.
    pub payload: String,
    pub status: OutboxStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub attempted_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    seq: i64,
    id: String,
    action: String,
    entity_id: Option<String>,
    payload: String,
    status: String,
    attempts: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    attempted_at: Option<DateTime<Utc>>,
    synced_at: Option<DateTime<Utc>>,
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = DbError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(OutboxEntry {
            seq: row.seq,
            id: row.id,
            action: row.action,
            entity_id: row.entity_id,
            payload: row.payload,
            status: row.status.parse()?,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            attempted_at: row.attempted_at,
            synced_at: row.synced_at,
        })
    }
}

/// Pending and given-up entry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OutboxCounts {
    pub pending: i64,
    pub failed: i64,
}

const SELECT_COLUMNS: &str = "seq, id, action, entity_id, payload, status, attempts, \
                              last_error, created_at, attempted_at, synced_at";

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    pool: SqlitePool,
}

impl OutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OutboxRepository { pool }
    }

    /// Queues a request for later delivery.
    pub async fn enqueue(
        &self,
        action: &str,
        entity_id: Option<&str>,
        payload: &str,
    ) -> DbResult<OutboxEntry> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(action, entity_id, "Queuing remote write");

        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sync_outbox (id, action, entity_id, payload, status, attempts, created_at)
            VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5)
            RETURNING seq
            "#,
        )
        .bind(&id)
        .bind(action)
        .bind(entity_id)
        .bind(payload)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxEntry {
            seq,
            id,
            action: action.to_string(),
            entity_id: entity_id.map(str::to_string),
            payload: payload.to_string(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at: now,
            attempted_at: None,
            synced_at: None,
        })
    }

    /// Pending entries, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<OutboxEntry>> {
        let sql = format!(
            "SELECT {} FROM sync_outbox WHERE status = 'pending' ORDER BY seq ASC LIMIT ?1",
            SELECT_COLUMNS
        );
        let rows: Vec<OutboxRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(OutboxEntry::try_from).collect()
    }

    /// Entries that were given up on, oldest first.
    pub async fn failed(&self) -> DbResult<Vec<OutboxEntry>> {
        let sql = format!(
            "SELECT {} FROM sync_outbox WHERE status = 'failed' ORDER BY seq ASC",
            SELECT_COLUMNS
        );
        let rows: Vec<OutboxRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter().map(OutboxEntry::try_from).collect()
    }

    /// Marks an entry as delivered.
    pub async fn mark_synced(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE sync_outbox SET
                status = 'synced',
                synced_at = ?2,
                attempted_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Outbox entry", id));
        }
        Ok(())
    }

    /// Records a failed delivery. The entry becomes `failed` once it has
    /// been attempted `max_attempts` times. Returns the resulting status.
    pub async fn mark_failed(
        &self,
        id: &str,
        error: &str,
        max_attempts: i64,
    ) -> DbResult<OutboxStatus> {
        let now = Utc::now();
        let status: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3,
                status = CASE WHEN attempts + 1 >= ?4 THEN 'failed' ELSE 'pending' END
            WHERE id = ?1
            RETURNING status
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(now)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;

        let status: OutboxStatus = status
            .ok_or_else(|| DbError::not_found("Outbox entry", id))?
            .parse()?;
        if status == OutboxStatus::Failed {
            warn!(id, error, "Giving up on remote write");
        }
        Ok(status)
    }

    /// Counts pending and failed entries.
    pub async fn counts(&self) -> DbResult<OutboxCounts> {
        let (pending, failed): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0)
            FROM sync_outbox
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxCounts { pending, failed })
    }

    /// Puts given-up entries back in the queue with a fresh attempt count.
    pub async fn retry_failed(&self) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE sync_outbox SET status = 'pending', attempts = 0 WHERE status = 'failed'",
        )
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Deletes delivered entries older than `days_old` days.
    pub async fn cleanup_synced(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(days_old));
        let result =
            sqlx::query("DELETE FROM sync_outbox WHERE status = 'synced' AND synced_at < ?1")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// Drops every entry (used by "clear all data").
    pub async fn clear(&self) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM sync_outbox")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn repo() -> OutboxRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().outbox()
    }

    #[tokio::test]
    async fn test_pending_in_insertion_order() {
        let outbox = repo().await;
        outbox.enqueue("saveBill", Some("b1"), "{}").await.unwrap();
        outbox.enqueue("updateMedicine", Some("m1"), "{}").await.unwrap();
        outbox.enqueue("saveSettings", None, "{}").await.unwrap();

        let actions: Vec<_> = outbox
            .pending(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(actions, vec!["saveBill", "updateMedicine", "saveSettings"]);
    }

    #[tokio::test]
    async fn test_synced_entries_leave_the_queue() {
        let outbox = repo().await;
        let entry = outbox.enqueue("saveBill", Some("b1"), "{}").await.unwrap();
        outbox.mark_synced(&entry.id).await.unwrap();

        assert!(outbox.pending(10).await.unwrap().is_empty());
        assert_eq!(outbox.counts().await.unwrap(), OutboxCounts::default());
        assert!(outbox.mark_synced("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let outbox = repo().await;
        let entry = outbox.enqueue("saveBill", Some("b1"), "{}").await.unwrap();

        for _ in 0..4 {
            let status = outbox.mark_failed(&entry.id, "HTTP 500", 5).await.unwrap();
            assert_eq!(status, OutboxStatus::Pending);
        }
        let status = outbox.mark_failed(&entry.id, "HTTP 500", 5).await.unwrap();
        assert_eq!(status, OutboxStatus::Failed);

        let counts = outbox.counts().await.unwrap();
        assert_eq!(counts, OutboxCounts { pending: 0, failed: 1 });

        let failed = outbox.failed().await.unwrap();
        assert_eq!(failed[0].attempts, 5);
        assert_eq!(failed[0].last_error.as_deref(), Some("HTTP 500"));

        assert_eq!(outbox.retry_failed().await.unwrap(), 1);
        assert_eq!(outbox.pending(10).await.unwrap()[0].attempts, 0);
    }

    #[tokio::test]
    async fn test_clear() {
        let outbox = repo().await;
        outbox.enqueue("saveBill", None, "{}").await.unwrap();
        outbox.enqueue("saveBill", None, "{}").await.unwrap();
        assert_eq!(outbox.clear().await.unwrap(), 2);
        assert_eq!(outbox.counts().await.unwrap().pending, 0);
    }
}
