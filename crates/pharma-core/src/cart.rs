//! # Cart
//!
//! The in-progress bill on the billing page.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator Action        Cart Method             Rule                    │
//! │  ───────────────        ───────────             ────                    │
//! │                                                                         │
//! │  Pick medicine ───────► add_medicine() ───────► out of stock: reject    │
//! │                                                 in cart: qty + 1        │
//! │                                                 qty == stock: reject    │
//! │                                                                         │
//! │  − / + buttons ───────► change_quantity() ────► < 1: remove line        │
//! │                                                 > stock: reject         │
//! │                                                                         │
//! │  Type a quantity ─────► set_quantity() ───────► clamp to [1, stock]     │
//! │                                                                         │
//! │  Save & print ────────► checkout() ───────────► empty: reject           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines are snapshots: price, tax rate and name are frozen when the
//! medicine is first added.

use serde::{Deserialize, Serialize};

use crate::billing::{BillDraft, BillTotals};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BillItem, Medicine, PaymentMode, TaxRate};
use crate::validation::validate_cart_size;

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub medicine_id: String,
    pub name: String,
    pub manufacturer: String,
    pub unit_price_cents: i64,
    pub tax_rate_bps: u32,
    pub quantity: i64,
    /// Stock on hand when the line was last touched.
    pub available_stock: i64,
    pub drug_schedule: Option<String>,
}

impl CartLine {
    /// Freezes a medicine into a cart line of quantity 1.
    pub fn from_medicine(medicine: &Medicine) -> Self {
        CartLine {
            medicine_id: medicine.id.clone(),
            name: medicine.name.clone(),
            manufacturer: medicine.manufacturer.clone(),
            unit_price_cents: medicine.mrp_cents,
            tax_rate_bps: medicine.tax_rate_bps,
            quantity: 1,
            available_stock: medicine.stock,
            drug_schedule: medicine.drug_schedule.clone(),
        }
    }

    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    pub fn tax(&self) -> Money {
        self.line_total()
            .calculate_tax(TaxRate::from_bps(self.tax_rate_bps))
    }

    pub fn to_bill_item(&self) -> BillItem {
        BillItem {
            medicine_id: self.medicine_id.clone(),
            name: self.name.clone(),
            quantity: self.quantity,
            unit_price_cents: self.unit_price_cents,
            tax_rate_bps: self.tax_rate_bps,
            line_total_cents: self.line_total().cents(),
        }
    }
}

/// Outcome of a quantity edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Quantity set as requested.
    Updated(i64),
    /// Request exceeded stock; quantity set to the stock level.
    Clamped(i64),
    /// Quantity went below one and the line was removed.
    Removed,
}

/// The in-progress cart.
///
/// ## Invariants
/// - Lines are unique by medicine id
/// - Every line has 1 ≤ quantity ≤ available stock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Cart::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Adds one unit of a medicine. Returns the line's new quantity.
    ///
    /// The cart is left unchanged on error.
    pub fn add_medicine(&mut self, medicine: &Medicine) -> CoreResult<i64> {
        if medicine.stock <= 0 {
            return Err(CoreError::OutOfStock {
                name: medicine.name.clone(),
            });
        }

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.medicine_id == medicine.id)
        {
            if line.quantity >= medicine.stock {
                return Err(CoreError::InsufficientStock {
                    name: medicine.name.clone(),
                    available: medicine.stock,
                    requested: line.quantity + 1,
                });
            }
            line.available_stock = medicine.stock;
            line.quantity += 1;
            return Ok(line.quantity);
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: crate::MAX_CART_ITEMS,
        })?;
        self.lines.push(CartLine::from_medicine(medicine));
        Ok(1)
    }

    /// Steps a line's quantity by `delta` (the − / + buttons).
    pub fn change_quantity(&mut self, index: usize, delta: i64) -> CoreResult<QuantityChange> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound(index))?;
        let requested = line.quantity + delta;

        if requested < 1 {
            self.lines.remove(index);
            return Ok(QuantityChange::Removed);
        }
        if requested > line.available_stock {
            return Err(CoreError::InsufficientStock {
                name: line.name.clone(),
                available: line.available_stock,
                requested,
            });
        }
        line.quantity = requested;
        Ok(QuantityChange::Updated(requested))
    }

    /// Sets a line's quantity, clamped to `[1, available stock]`.
    pub fn set_quantity(&mut self, index: usize, quantity: i64) -> CoreResult<QuantityChange> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(CoreError::LineNotFound(index))?;

        if quantity > line.available_stock {
            line.quantity = line.available_stock.max(1);
            return Ok(QuantityChange::Clamped(line.quantity));
        }
        line.quantity = quantity.max(1);
        Ok(QuantityChange::Updated(line.quantity))
    }

    /// Removes a line by position.
    pub fn remove(&mut self, index: usize) -> CoreResult<CartLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineNotFound(index));
        }
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn bill_items(&self) -> Vec<BillItem> {
        self.lines.iter().map(CartLine::to_bill_item).collect()
    }

    /// Running totals shown beside the cart.
    pub fn totals(&self, discount: Money) -> BillTotals {
        BillTotals::compute(&self.bill_items(), discount)
    }

    /// Turns the cart into a bill draft. The cart itself is not cleared;
    /// callers reset it once the bill is recorded.
    pub fn checkout(
        &self,
        payment_mode: PaymentMode,
        discount: Money,
        patient_name: &str,
        doctor_name: &str,
    ) -> CoreResult<BillDraft> {
        let draft = BillDraft {
            items: self.bill_items(),
            payment_mode,
            discount,
            patient_name: patient_name.to_string(),
            doctor_name: doctor_name.to_string(),
        };
        draft.validate()?;
        Ok(draft)
    }
}
