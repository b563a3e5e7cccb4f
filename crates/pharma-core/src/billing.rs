//! # Billing
//!
//! Bill totals, bill numbering and the stock deduction a sale causes.
//!
//! ```text
//! subtotal = Σ qty × price
//! tax      = Σ round(qty × price × rate)       (rounded per line)
//! grand    = subtotal + tax − discount         (0 ≤ discount ≤ subtotal + tax)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Bill, BillItem, Medicine, PaymentMode};
use crate::validation::validate_discount;

/// Prefix of every display bill number.
pub const BILL_NUMBER_PREFIX: &str = "BILL-";

/// Totals of a bill or an in-progress cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub grand_total: Money,
}

impl BillTotals {
    /// Sums the lines and applies a flat discount.
    pub fn compute(items: &[BillItem], discount: Money) -> Self {
        let subtotal: Money = items.iter().map(BillItem::line_total).sum();
        let tax: Money = items.iter().map(BillItem::tax).sum();
        BillTotals {
            subtotal,
            tax,
            discount,
            grand_total: subtotal + tax - discount,
        }
    }

    /// What the customer owes before discount.
    pub fn payable(&self) -> Money {
        self.subtotal + self.tax
    }
}

/// Display number for the next bill: `BILL-0001` for an empty ledger.
///
/// Numbers wider than four digits are not truncated.
pub fn next_bill_number(existing_bills: usize) -> String {
    format!("{}{:04}", BILL_NUMBER_PREFIX, existing_bills + 1)
}

/// A bill ready to be recorded, minus identity, number and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillDraft {
    pub items: Vec<BillItem>,
    pub payment_mode: PaymentMode,
    pub discount: Money,
    pub patient_name: String,
    pub doctor_name: String,
}

impl BillDraft {
    /// Checks the draft can be recorded and returns its totals.
    pub fn validate(&self) -> CoreResult<BillTotals> {
        if self.items.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let totals = BillTotals::compute(&self.items, self.discount);
        validate_discount(self.discount, totals.payable())?;
        Ok(totals)
    }

    /// Stamps identity, number and creation time onto the draft.
    pub fn into_bill(self, id: String, bill_no: String, now: DateTime<Utc>) -> CoreResult<Bill> {
        let totals = self.validate()?;
        Ok(Bill {
            id,
            bill_no,
            items: self.items,
            payment_mode: self.payment_mode,
            subtotal_cents: totals.subtotal.cents(),
            tax_cents: totals.tax.cents(),
            discount_cents: totals.discount.cents(),
            grand_total_cents: totals.grand_total.cents(),
            patient_name: self.patient_name.trim().to_string(),
            doctor_name: self.doctor_name.trim().to_string(),
            created_at: now,
        })
    }
}

/// Builds a bill line from a medicine and quantity.
pub fn bill_item(medicine: &Medicine, quantity: i64) -> BillItem {
    BillItem {
        medicine_id: medicine.id.clone(),
        name: medicine.name.clone(),
        quantity,
        unit_price_cents: medicine.mrp_cents,
        tax_rate_bps: medicine.tax_rate_bps,
        line_total_cents: medicine.mrp().multiply_quantity(quantity).cents(),
    }
}

/// Subtracts sold quantities from the catalog, flooring stock at zero.
///
/// Lines whose medicine no longer exists are skipped. Returns the ids of the
/// medicines that changed, in line order, each once.
pub fn deduct_stock(
    medicines: &mut [Medicine],
    items: &[BillItem],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut touched: Vec<String> = Vec::new();
    for item in items {
        if let Some(med) = medicines.iter_mut().find(|m| m.id == item.medicine_id) {
            med.stock = (med.stock - item.quantity).max(0);
            med.updated_at = Some(now);
            if !touched.contains(&med.id) {
                touched.push(med.id.clone());
            }
        }
    }
    touched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MedicineDraft, TaxRate};
    use crate::ValidationError;

    fn med(id: &str, mrp_cents: i64, pct: u32, stock: i64) -> Medicine {
        MedicineDraft {
            name: format!("Medicine {}", id),
            mrp_cents,
            tax_rate_bps: TaxRate::from_percent(pct).bps(),
            stock,
            ..Default::default()
        }
        .into_medicine(id.to_string(), Utc::now())
    }

    fn draft(discount_cents: i64) -> BillDraft {
        BillDraft {
            items: vec![
                bill_item(&med("a", 1250, 5, 200), 2),
                bill_item(&med("b", 4500, 12, 80), 3),
            ],
            payment_mode: PaymentMode::Cash,
            discount: Money::from_cents(discount_cents),
            patient_name: " Asha ".to_string(),
            doctor_name: String::new(),
        }
    }

    #[test]
    fn test_two_line_bill_totals() {
        let totals = draft(1000).validate().unwrap();
        assert_eq!(totals.subtotal.cents(), 16000);
        assert_eq!(totals.tax.cents(), 1745);
        assert_eq!(totals.discount.cents(), 1000);
        assert_eq!(totals.grand_total.cents(), 16745);
    }

    #[test]
    fn test_grand_total_invariant_on_created_bill() {
        let bill = draft(1000)
            .into_bill("id".into(), next_bill_number(0), Utc::now())
            .unwrap();
        assert_eq!(
            bill.grand_total(),
            bill.subtotal() + bill.tax() - bill.discount()
        );
        assert_eq!(bill.bill_no, "BILL-0001");
        assert_eq!(bill.patient_name, "Asha");
    }

    #[test]
    fn test_empty_draft_rejected() {
        let mut d = draft(0);
        d.items.clear();
        assert!(matches!(d.validate(), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_discount_larger_than_bill_rejected() {
        let err = draft(17746).validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { .. })
        ));
        // Exactly the payable amount is a free bill, not an error
        assert_eq!(draft(17745).validate().unwrap().grand_total, Money::zero());
    }

    #[test]
    fn test_bill_numbering() {
        assert_eq!(next_bill_number(0), "BILL-0001");
        assert_eq!(next_bill_number(41), "BILL-0042");
        assert_eq!(next_bill_number(12345), "BILL-12346");
    }

    #[test]
    fn test_deduct_stock_floors_at_zero() {
        let mut catalog = vec![med("a", 1250, 5, 5), med("b", 4500, 12, 80)];
        let items = vec![
            bill_item(&catalog[0], 7),
            bill_item(&catalog[1], 3),
            BillItem {
                medicine_id: "gone".into(),
                ..bill_item(&catalog[1], 1)
            },
        ];

        let touched = deduct_stock(&mut catalog, &items, Utc::now());

        assert_eq!(catalog[0].stock, 0);
        assert_eq!(catalog[1].stock, 77);
        assert_eq!(touched, vec!["a".to_string(), "b".to_string()]);
    }
}
