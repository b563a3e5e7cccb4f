//! # CLI Error Type
//!
//! Unified error type for counter commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Counter App                        │
//! │                                                                         │
//! │  pharmacy stock add --name ""                                           │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  CliResult<String>                                               │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Database Error? ─── DbError / SyncError::DatabaseError ──┐      │  │
//! │  │         │                                                 │      │  │
//! │  │         ▼                                                 ▼      │  │
//! │  │  Validation Error? ─── CoreError::Validation ─────── CliError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ── rendered page text ─────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  One-shot mode: message on stderr, exit code from ErrorCode            │
//! │  Shell mode:    message printed as a notice, the shell keeps going      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pharma_core::CoreError;
use pharma_db::DbError;
use pharma_sync::SyncError;

/// Error returned from counter commands.
#[derive(Debug, Clone)]
pub struct CliError {
    /// Machine-readable error code, mapped to the process exit status
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Record not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Business rule blocked the action (stock, cart, discount)
    BusinessLogic,

    /// Local storage failed
    DatabaseError,

    /// Endpoint unreachable, rejected or answered garbage
    RemoteError,

    /// Configuration file or endpoint setting is wrong
    ConfigError,

    /// Reading or writing a file failed
    IoError,

    /// Anything else
    Internal,
}

impl ErrorCode {
    /// Exit status for one-shot mode.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorCode::ValidationError | ErrorCode::BusinessLogic | ErrorCode::NotFound => 2,
            ErrorCode::ConfigError => 3,
            ErrorCode::RemoteError => 4,
            ErrorCode::DatabaseError | ErrorCode::IoError | ErrorCode::Internal => 1,
        }
    }
}

impl CliError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CliError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CliError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ValidationError, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        CliError::new(ErrorCode::ConfigError, message)
    }
}

/// Result type for counter commands.
pub type CliResult<T> = Result<T, CliError>;

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::MedicineNotFound(id) => CliError::not_found("Medicine", &id),
            CoreError::Validation(e) => CliError::validation(e.to_string()),
            other @ (CoreError::OutOfStock { .. }
            | CoreError::InsufficientStock { .. }
            | CoreError::LineNotFound(_)
            | CoreError::EmptyCart
            | CoreError::CartTooLarge { .. }) => {
                CliError::new(ErrorCode::BusinessLogic, other.to_string())
            }
        }
    }
}

impl From<DbError> for CliError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CliError::not_found(&entity, &id),
            other if other.is_transient() => CliError::new(
                ErrorCode::DatabaseError,
                "Local database is busy, try again in a moment",
            ),
            other => {
                // Log the actual error but show a short message
                tracing::error!(error = %other, "Local storage failed");
                CliError::new(ErrorCode::DatabaseError, "Local storage failed")
            }
        }
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Core(e) => e.into(),
            SyncError::NotFound { entity, id } => CliError::not_found(entity, &id),
            SyncError::DatabaseError(e) => {
                tracing::error!(error = %e, "Local storage failed");
                CliError::new(ErrorCode::DatabaseError, "Local storage failed")
            }
            e @ SyncError::InvalidBackup(_) => CliError::validation(e.to_string()),
            e if e.is_config_error() => CliError::config(e.to_string()),
            e @ (SyncError::RequestFailed(_)
            | SyncError::HttpStatus(_)
            | SyncError::RemoteRejected(_)
            | SyncError::InvalidResponse(_)) => CliError::new(ErrorCode::RemoteError, e.to_string()),
            other => CliError::new(ErrorCode::Internal, other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::new(ErrorCode::IoError, err.to_string())
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}
