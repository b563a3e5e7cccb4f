//! # Cache Store
//!
//! The shop's collections as whole JSON documents under fixed keys.
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────┐
//! │ key                  │ value                                        │
//! ├──────────────────────┼──────────────────────────────────────────────┤
//! │ pharma_medicines     │ [Medicine, ...]                              │
//! │ pharma_bills         │ [Bill, ...]                                  │
//! │ pharma_settings      │ Settings                                     │
//! │ pharma_sheets_url    │ "https://script.google.com/..."              │
//! └──────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Reads never fail. A missing key, a broken row or a document that no
//! longer deserializes all yield the type's default, with a warning logged.
//! Writes overwrite the whole document.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use pharma_core::{Bill, Medicine, Settings};

/// Fixed cache keys.
pub mod keys {
    pub const MEDICINES: &str = "pharma_medicines";
    pub const BILLS: &str = "pharma_bills";
    pub const SETTINGS: &str = "pharma_settings";
    pub const ENDPOINT: &str = "pharma_sheets_url";

    /// Every key the app writes, in the order "clear all data" removes them.
    pub const ALL: [&str; 4] = [MEDICINES, BILLS, SETTINGS, ENDPOINT];
}

/// Repository over the `cache_entries` table.
#[derive(Debug, Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        CacheStore { pool }
    }

    /// Raw document text for a key.
    pub async fn read_raw(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM cache_entries WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    /// Reads and decodes a document, falling back to `T::default()`.
    pub async fn read<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.read_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, using default");
                return T::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache entry is malformed, using default");
                T::default()
            }
        }
    }

    /// Serializes and stores a document, replacing any previous value.
    pub async fn write<T>(&self, key: &str, value: &T) -> DbResult<()>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_string(value).map_err(|e| DbError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.write_raw(key, &json).await
    }

    /// Stores document text as-is.
    pub async fn write_raw(&self, key: &str, json: &str) -> DbResult<()> {
        debug!(key, bytes = json.len(), "Writing cache entry");

        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes a key. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        debug!(key, "Removing cache entry");
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Typed documents
    // =========================================================================

    pub async fn medicines(&self) -> Vec<Medicine> {
        self.read(keys::MEDICINES).await
    }

    pub async fn set_medicines(&self, medicines: &[Medicine]) -> DbResult<()> {
        self.write(keys::MEDICINES, medicines).await
    }

    pub async fn bills(&self) -> Vec<Bill> {
        self.read(keys::BILLS).await
    }

    pub async fn set_bills(&self, bills: &[Bill]) -> DbResult<()> {
        self.write(keys::BILLS, bills).await
    }

    pub async fn settings(&self) -> Settings {
        self.read(keys::SETTINGS).await
    }

    pub async fn set_settings(&self, settings: &Settings) -> DbResult<()> {
        self.write(keys::SETTINGS, settings).await
    }

    /// Stored endpoint URL; empty when never set.
    pub async fn endpoint(&self) -> String {
        self.read(keys::ENDPOINT).await
    }

    pub async fn set_endpoint(&self, url: &str) -> DbResult<()> {
        self.write(keys::ENDPOINT, url).await
    }
}
