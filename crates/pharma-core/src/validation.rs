//! # Validation Module
//!
//! Input rules for the medicine, restock, billing and settings forms.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI arguments (clap)   ── type and shape of each flag         │
//! │  Layer 2: THIS MODULE            ── business rules, blocks the action   │
//! │  Layer 3: Sync boundary (wire)   ── remote records, rejected per record │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed rule never leaves a partial effect behind: callers validate
//! before touching the cart or the store.
//!
//! ```rust
//! use pharma_core::validation::{parse_amount, validate_quantity};
//!
//! assert_eq!(parse_amount("mrp", "12.50").unwrap().cents(), 1250);
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{ExpiryMonth, MedicineDraft};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_QUERY_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Medicine name: required, at most 200 characters.
pub fn validate_medicine_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Trims a search query. Empty is allowed (and means "no results" in the
/// billing dropdown, "no filter" on the stock page).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_QUERY_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_QUERY_LEN,
        });
    }

    Ok(query.to_string())
}

/// Parses an amount typed in rupees (`12.50`).
pub fn parse_amount(field: &str, text: &str) -> ValidationResult<Money> {
    Money::parse_major(text).ok_or_else(|| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("'{}' is not an amount", text.trim()),
    })
}

/// Parses a required expiry month (`2027-03`).
pub fn parse_expiry(text: &str) -> ValidationResult<ExpiryMonth> {
    if text.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "expiry".to_string(),
        });
    }
    text.parse()
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Cart quantity: 1 to MAX_ITEM_QUANTITY.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Restock quantity: at least one unit.
pub fn validate_restock_quantity(qty: i64) -> ValidationResult<()> {
    if qty < 1 {
        return Err(ValidationError::OutOfRange {
            field: "restock quantity".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Prices may be zero (free samples) but not negative.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Tax rate: 0% to 100%.
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "gst".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

/// Discount must be between zero and the payable amount (subtotal + tax),
/// so a grand total can never go negative.
pub fn validate_discount(discount: Money, payable: Money) -> ValidationResult<()> {
    if discount.is_negative() {
        return Err(ValidationError::Negative {
            field: "discount".to_string(),
        });
    }

    if discount > payable {
        return Err(ValidationError::OutOfRange {
            field: "discount".to_string(),
            min: 0,
            max: payable.cents(),
        });
    }

    Ok(())
}

/// Low-stock threshold: at least one unit.
pub fn validate_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 1 {
        return Err(ValidationError::OutOfRange {
            field: "low stock threshold".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

/// Add/edit medicine form: name required, prices and stock not negative.
pub fn validate_medicine_draft(draft: &MedicineDraft) -> ValidationResult<()> {
    validate_medicine_name(&draft.name)?;
    validate_price("mrp", Money::from_cents(draft.mrp_cents))?;
    validate_price("cost price", Money::from_cents(draft.cost_price_cents))?;
    validate_tax_rate_bps(draft.tax_rate_bps)?;

    if draft.stock < 0 {
        return Err(ValidationError::Negative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Cart may hold at most MAX_CART_ITEMS distinct lines.
pub fn validate_cart_size(current_items: usize) -> ValidationResult<()> {
    if current_items >= MAX_CART_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "cart items".to_string(),
            min: 0,
            max: MAX_CART_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_medicine_name() {
        assert!(validate_medicine_name("Paracetamol 500mg").is_ok());
        assert!(validate_medicine_name("").is_err());
        assert!(validate_medicine_name("   ").is_err());
        assert!(validate_medicine_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("mrp", "45").unwrap().cents(), 4500);
        let err = parse_amount("mrp", "forty").unwrap_err();
        assert_eq!(err.to_string(), "mrp has invalid format: 'forty' is not an amount");
    }

    #[test]
    fn test_parse_expiry_required() {
        assert!(matches!(
            parse_expiry(" "),
            Err(ValidationError::Required { .. })
        ));
        assert_eq!(parse_expiry("2027-03").unwrap().to_string(), "2027-03");
        assert!(parse_expiry("March").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_restock_quantity() {
        assert!(validate_restock_quantity(1).is_ok());
        assert!(validate_restock_quantity(0).is_err());
    }

    #[test]
    fn test_validate_discount() {
        let payable = Money::from_cents(17745);
        assert!(validate_discount(Money::from_cents(1000), payable).is_ok());
        assert!(validate_discount(payable, payable).is_ok());
        assert!(validate_discount(Money::from_cents(17746), payable).is_err());
        assert!(validate_discount(Money::from_cents(-1), payable).is_err());
    }

    #[test]
    fn test_validate_medicine_draft() {
        let mut draft = MedicineDraft {
            name: "Amoxicillin 250mg".to_string(),
            mrp_cents: 4500,
            ..Default::default()
        };
        assert!(validate_medicine_draft(&draft).is_ok());

        draft.mrp_cents = -1;
        assert!(validate_medicine_draft(&draft).is_err());

        draft.mrp_cents = 0;
        draft.name.clear();
        assert!(matches!(
            validate_medicine_draft(&draft),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_threshold_and_tax() {
        assert!(validate_threshold(10).is_ok());
        assert!(validate_threshold(0).is_err());
        assert!(validate_tax_rate_bps(2800).is_ok());
        assert!(validate_tax_rate_bps(10001).is_err());
    }

    #[test]
    fn test_validate_cart_size() {
        assert!(validate_cart_size(0).is_ok());
        assert!(validate_cart_size(MAX_CART_ITEMS).is_err());
    }
}
