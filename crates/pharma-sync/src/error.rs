//! # Sync Error Types
//!
//! Errors raised by the data facade and the remote client.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sync Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Protocol            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  RequestFailed  │  │  RemoteRejected         │ │
//! │  │  InvalidUrl     │  │  HttpStatus     │  │  InvalidResponse        │ │
//! │  │  NotConfigured  │  │                 │  │  SerializationFailed    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Database     │  │    Business     │  │      Backup             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  DatabaseError  │  │  Core           │  │  InvalidBackup          │ │
//! │  │                 │  │  NotFound       │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Remote failures during ordinary reads and writes never reach callers as
//! errors; the facade logs them and falls back to the cache. They surface
//! only from explicit sync actions (test connection, push all, flush).

use thiserror::Error;

use pharma_core::{CoreError, ValidationError};

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid sync configuration.
    #[error("Invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Endpoint text is not a usable URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Endpoint does not start with the allowed prefix.
    #[error("Endpoint must start with {prefix}")]
    EndpointRejected { prefix: String },

    /// An explicit sync action was requested without an endpoint.
    #[error("Not configured")]
    NotConfigured,

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// The request never produced a response.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The endpoint answered with a non-success status.
    #[error("Endpoint returned HTTP {0}")]
    HttpStatus(u16),

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    /// The endpoint answered `ok: false`.
    #[error("Remote rejected the request: {0}")]
    RemoteRejected(String),

    /// The response body is not the expected envelope.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Failed to serialize or deserialize JSON.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    // =========================================================================
    // Database Errors
    // =========================================================================
    /// Local storage failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    // =========================================================================
    // Business Errors
    // =========================================================================
    /// A business rule or form validation blocked the action.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A record the action refers to does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    // =========================================================================
    // Backup Errors
    // =========================================================================
    /// Backup text is not a valid backup document.
    #[error("Invalid backup file: {0}")]
    InvalidBackup(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<pharma_db::DbError> for SyncError {
    fn from(err: pharma_db::DbError) -> Self {
        SyncError::DatabaseError(err.to_string())
    }
}

impl From<ValidationError> for SyncError {
    fn from(err: ValidationError) -> Self {
        SyncError::Core(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::SerializationFailed(err.to_string())
    }
}

impl From<url::ParseError> for SyncError {
    fn from(err: url::ParseError) -> Self {
        SyncError::InvalidUrl(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            SyncError::HttpStatus(status.as_u16())
        } else if err.is_decode() {
            SyncError::InvalidResponse(err.to_string())
        } else {
            SyncError::RequestFailed(err.to_string())
        }
    }
}

// Config file reads and writes in the counter app.
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SyncError {
    fn from(err: toml::ser::Error) -> Self {
        SyncError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl SyncError {
    /// Returns true if replaying the same request later may succeed.
    ///
    /// Transport failures and server errors are retryable. A remote
    /// `ok: false` is too, since spreadsheet scripts fail on lock contention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::RequestFailed(_) | SyncError::RemoteRejected(_) => true,
            SyncError::HttpStatus(code) => *code >= 500 || *code == 429,
            _ => false,
        }
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SyncError::InvalidConfig(_)
                | SyncError::InvalidUrl(_)
                | SyncError::EndpointRejected { .. }
                | SyncError::NotConfigured
                | SyncError::ConfigLoadFailed(_)
                | SyncError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the user's input was refused by a business rule.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, SyncError::Core(_) | SyncError::NotFound { .. })
    }
}
