//! Demo data for a fresh install: ten common medicines and four bills.
//!
//! Expiry months are fixed calendar months, so some demo stock is already
//! expired and some is expiring depending on when the shop is opened.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::billing::{bill_item, next_bill_number, BillDraft};
use crate::money::Money;
use crate::types::{Bill, ExpiryMonth, Medicine, MedicineDraft, PaymentMode, TaxRate};

struct DemoMedicine {
    name: &'static str,
    generic: &'static str,
    manufacturer: &'static str,
    category: &'static str,
    stock: i64,
    mrp_cents: i64,
    cost_cents: i64,
    unit: &'static str,
    batch: &'static str,
    expiry: (i32, u32),
    gst_percent: u32,
}

const DEMO_MEDICINES: [DemoMedicine; 10] = [
    DemoMedicine { name: "Paracetamol 500mg", generic: "Paracetamol", manufacturer: "Sun Pharma", category: "Analgesic", stock: 200, mrp_cents: 1250, cost_cents: 800, unit: "Strip", batch: "B001", expiry: (2026, 12), gst_percent: 5 },
    DemoMedicine { name: "Amoxicillin 250mg", generic: "Amoxicillin", manufacturer: "Cipla", category: "Antibiotic", stock: 80, mrp_cents: 4500, cost_cents: 3000, unit: "Strip", batch: "B002", expiry: (2026, 6), gst_percent: 12 },
    DemoMedicine { name: "Metformin 500mg", generic: "Metformin", manufacturer: "Dr. Reddy's", category: "Antidiabetic", stock: 5, mrp_cents: 2800, cost_cents: 1800, unit: "Strip", batch: "B003", expiry: (2025, 9), gst_percent: 5 },
    DemoMedicine { name: "Atorvastatin 10mg", generic: "Atorvastatin", manufacturer: "Lupin", category: "Cardiac", stock: 60, mrp_cents: 9500, cost_cents: 6000, unit: "Strip", batch: "B004", expiry: (2027, 3), gst_percent: 12 },
    DemoMedicine { name: "Omeprazole 20mg", generic: "Omeprazole", manufacturer: "Mankind", category: "Antacid", stock: 120, mrp_cents: 3500, cost_cents: 2200, unit: "Strip", batch: "B005", expiry: (2026, 11), gst_percent: 5 },
    DemoMedicine { name: "Cetirizine 10mg", generic: "Cetirizine", manufacturer: "Zydus", category: "Antihistamine", stock: 8, mrp_cents: 1800, cost_cents: 1100, unit: "Strip", batch: "B006", expiry: (2026, 8), gst_percent: 5 },
    DemoMedicine { name: "Azithromycin 500mg", generic: "Azithromycin", manufacturer: "Cipla", category: "Antibiotic", stock: 40, mrp_cents: 8500, cost_cents: 5500, unit: "Strip", batch: "B007", expiry: (2026, 4), gst_percent: 12 },
    DemoMedicine { name: "Vitamin D3 60K", generic: "Cholecalciferol", manufacturer: "Abbott", category: "Supplement", stock: 90, mrp_cents: 4200, cost_cents: 2800, unit: "Capsule", batch: "B008", expiry: (2027, 1), gst_percent: 0 },
    DemoMedicine { name: "Ibuprofen 400mg", generic: "Ibuprofen", manufacturer: "Sun Pharma", category: "Analgesic", stock: 150, mrp_cents: 2200, cost_cents: 1400, unit: "Strip", batch: "B009", expiry: (2026, 10), gst_percent: 5 },
    DemoMedicine { name: "Pantoprazole 40mg", generic: "Pantoprazole", manufacturer: "Torrent", category: "Antacid", stock: 3, mrp_cents: 5500, cost_cents: 3500, unit: "Strip", batch: "B010", expiry: (2026, 7), gst_percent: 5 },
];

/// The demo catalog, in display order, with fresh ids.
pub fn demo_medicines(now: DateTime<Utc>) -> Vec<Medicine> {
    DEMO_MEDICINES
        .iter()
        .map(|d| {
            MedicineDraft {
                name: d.name.to_string(),
                generic: d.generic.to_string(),
                manufacturer: d.manufacturer.to_string(),
                category: d.category.to_string(),
                unit: d.unit.to_string(),
                stock: d.stock,
                mrp_cents: d.mrp_cents,
                cost_price_cents: d.cost_cents,
                tax_rate_bps: TaxRate::from_percent(d.gst_percent).bps(),
                batch: d.batch.to_string(),
                expiry: ExpiryMonth::new(d.expiry.0, d.expiry.1),
                ..Default::default()
            }
            .into_medicine(Uuid::new_v4().to_string(), now)
        })
        .collect()
}

/// Four sample bills against the demo catalog: two today, one yesterday,
/// one the day before. Stock is not deducted for them.
///
/// Returns nothing when the catalog is too small to sell from.
pub fn demo_bills(medicines: &[Medicine], now: DateTime<Utc>) -> Vec<Bill> {
    if medicines.len() < 8 {
        return Vec::new();
    }
    let plan = [
        (0usize, 2i64, PaymentMode::Cash, 0i64),
        (2, 3, PaymentMode::Upi, 0),
        (3, 1, PaymentMode::Cash, 1),
        (7, 5, PaymentMode::Upi, 2),
    ];

    let mut bills = Vec::with_capacity(plan.len());
    for (index, qty, mode, days_ago) in plan {
        let draft = BillDraft {
            items: vec![bill_item(&medicines[index], qty)],
            payment_mode: mode,
            discount: Money::zero(),
            patient_name: String::new(),
            doctor_name: String::new(),
        };
        let created_at = now - Duration::days(days_ago);
        // A positive-quantity, undiscounted draft always validates
        if let Ok(bill) = draft.into_bill(
            Uuid::new_v4().to_string(),
            next_bill_number(bills.len()),
            created_at,
        ) {
            bills.push(bill);
        }
    }
    bills
}
