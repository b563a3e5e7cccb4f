//! # Error Types
//!
//! Domain-specific error types for pharma-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pharma-core errors (this file)                                        │
//! │  ├── CoreError        - Cart and billing rule violations               │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  pharma-db   └── DbError    - SQLite failures                          │
//! │  pharma-sync └── SyncError  - Config, local storage, protocol          │
//! │  apps/counter└── CliError   - What the operator sees                   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SyncError → CliError → terminal   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the cart and billing logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Medicine id does not exist in the catalog.
    #[error("Medicine not found: {0}")]
    MedicineNotFound(String),

    /// Medicine has nothing on hand.
    #[error("{name} is out of stock")]
    OutOfStock { name: String },

    /// Requested quantity is more than what is on hand.
    ///
    /// ```text
    /// cart line qty == stock ──► add again ──► InsufficientStock (qty unchanged)
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cart line index does not exist.
    #[error("No cart line at position {0}")]
    LineNotFound(usize),

    /// Submitting a bill with nothing in it.
    #[error("Add at least one medicine to the bill")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the point of entry; the action is blocked with no partial effect.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., bad amount, bad month).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Paracetamol 500mg".to_string(),
            available: 3,
            requested: 4,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Paracetamol 500mg: available 3, requested 4"
        );
        assert_eq!(
            CoreError::EmptyCart.to_string(),
            "Add at least one medicine to the bill"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Negative {
            field: "mrp".to_string(),
        };
        assert_eq!(err.to_string(), "mrp must not be negative");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "expiry".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
