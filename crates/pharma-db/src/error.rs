//! # Database Error Types
//!
//! ```text
//! sqlx::Error / MigrateError / serde_json::Error
//!        │
//!        ▼
//! DbError (this module)
//!        │
//!        ▼
//! SyncError::Database (pharma-sync) ──► CliError (counter app)
//! ```
//!
//! Cache *reads* never produce these: a missing or unreadable document
//! degrades to its default. Only writes and outbox bookkeeping surface them.

use thiserror::Error;

/// Local storage failures.
#[derive(Debug, Error)]
pub enum DbError {
    /// A row the caller named does not exist (outbox entries).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The database file could not be opened or created.
    #[error("Could not open the local database: {0}")]
    Open(String),

    /// Schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(String),

    /// Another connection holds the write lock and the wait ran out.
    #[error("Local database is busy")]
    Busy,

    /// SQLite rejected a statement.
    #[error("Query failed: {0}")]
    Query(String),

    /// A value could not be turned into a cache document.
    #[error("Could not serialize '{key}': {reason}")]
    Serialization { key: String, reason: String },

    /// A stored row holds something this build does not understand.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Busy and pool timeouts go away on their own; the rest do not.
    pub fn is_transient(&self) -> bool {
        matches!(self, DbError::Busy)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                // SQLITE_BUSY / SQLITE_LOCKED surface as text
                if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy
                } else {
                    DbError::Query(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::Busy,
            sqlx::Error::PoolClosed => DbError::Open("pool is closed".to_string()),
            sqlx::Error::Io(e) => DbError::Open(e.to_string()),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::Corrupt(format!("column {}: {}", index, source))
            }

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_mapping() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));

        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_transient());

        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Open(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DbError::not_found("Outbox entry", "abc").to_string(),
            "Outbox entry not found: abc"
        );
        assert_eq!(DbError::Busy.to_string(), "Local database is busy");
    }
}
