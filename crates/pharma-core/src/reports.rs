//! # Reports
//!
//! Aggregations behind the dashboard, sales, payments and reports pages.
//! Every function takes `today` explicitly; days are UTC calendar days,
//! matching how bill timestamps are stored.
//!
//! ```text
//!            ┌──────────────┐
//!  bills ───►│ bills_between│──► PaymentSummary (cash/UPI, per day)
//!            └──────┬───────┘
//!                   ├────────► SalesFilter + SalesSummary
//!                   └────────► RevenueReport (per day, top medicines)
//!  medicines ─────────────────► DashboardSummary (+ today's bills)
//! ```

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::money::Money;
use crate::types::{Bill, ExpiryMonth, ExpiryStatus, Medicine, PaymentMode, StockStatus};

/// Bills shown in the dashboard's "recent" table.
pub const RECENT_BILLS: usize = 5;

/// Rows in the dashboard's attention table.
pub const ATTENTION_ROWS: usize = 8;

/// Rows in the top-medicines table.
pub const TOP_MEDICINES: usize = 10;

// =============================================================================
// Date helpers
// =============================================================================

/// First day of `today`'s month.
pub fn month_start(today: NaiveDate) -> NaiveDate {
    today.with_day(1).unwrap_or(today)
}

/// `n` consecutive days ending with `today`, oldest first.
pub fn last_n_days(today: NaiveDate, n: u32) -> Vec<NaiveDate> {
    (0..n)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
        .collect()
}

pub fn bills_on(bills: &[Bill], day: NaiveDate) -> Vec<&Bill> {
    bills.iter().filter(|b| b.day() == day).collect()
}

/// Bills whose day falls in `[from, to]`, inclusive on both ends.
pub fn bills_between(bills: &[Bill], from: NaiveDate, to: NaiveDate) -> Vec<&Bill> {
    bills
        .iter()
        .filter(|b| {
            let day = b.day();
            day >= from && day <= to
        })
        .collect()
}

/// Newest first.
pub fn sort_newest_first(bills: &mut [&Bill]) {
    bills.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

// =============================================================================
// Collections
// =============================================================================

/// Revenue split by payment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Collections {
    pub bills: usize,
    pub revenue: Money,
    pub cash: Money,
    pub upi: Money,
}

impl Collections {
    pub fn add(&mut self, bill: &Bill) {
        self.bills += 1;
        self.revenue += bill.grand_total();
        match bill.payment_mode {
            PaymentMode::Cash => self.cash += bill.grand_total(),
            PaymentMode::Upi => self.upi += bill.grand_total(),
        }
    }

    pub fn of<'a, I: IntoIterator<Item = &'a Bill>>(bills: I) -> Self {
        let mut c = Collections::default();
        for bill in bills {
            c.add(bill);
        }
        c
    }

    /// Average bill value; zero when there are no bills.
    pub fn average_per_bill(&self) -> Money {
        if self.bills == 0 {
            return Money::zero();
        }
        Money::from_cents(self.revenue.cents() / self.bills as i64)
    }
}

// =============================================================================
// Dashboard
// =============================================================================

/// Why a medicine is on the dashboard's attention list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionReason {
    Expired,
    ExpiringSoon,
    OutOfStock,
    LowStock,
}

impl AttentionReason {
    pub fn label(&self) -> &'static str {
        match self {
            AttentionReason::Expired => "Expired",
            AttentionReason::ExpiringSoon => "Expiring Soon",
            AttentionReason::OutOfStock => "Out of Stock",
            AttentionReason::LowStock => "Low Stock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttentionRow {
    pub medicine_id: String,
    pub name: String,
    pub stock: i64,
    pub expiry: Option<ExpiryMonth>,
    pub reason: AttentionReason,
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub today: Collections,
    pub month: Collections,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub expiring: usize,
    pub expired: usize,
    /// Out, then low, then expiring; de-duplicated; at most 8.
    pub attention: Vec<AttentionRow>,
    pub recent_bills: Vec<Bill>,
}

impl DashboardSummary {
    pub fn build(medicines: &[Medicine], bills: &[Bill], threshold: i64, today: NaiveDate) -> Self {
        let current = ExpiryMonth::of(today);

        let out: Vec<&Medicine> = medicines
            .iter()
            .filter(|m| m.stock_status(threshold) == StockStatus::Out)
            .collect();
        let low: Vec<&Medicine> = medicines
            .iter()
            .filter(|m| m.stock_status(threshold) == StockStatus::Low)
            .collect();
        let expiring: Vec<&Medicine> = medicines
            .iter()
            .filter(|m| m.expiry_status(current) == ExpiryStatus::Expiring)
            .collect();
        let expired = medicines
            .iter()
            .filter(|m| m.expiry_status(current) == ExpiryStatus::Expired)
            .count();

        let mut attention: Vec<AttentionRow> = Vec::new();
        for m in out.iter().chain(low.iter()).chain(expiring.iter()) {
            if attention.len() == ATTENTION_ROWS {
                break;
            }
            if attention.iter().any(|row| row.medicine_id == m.id) {
                continue;
            }
            let reason = match (m.expiry_status(current), m.stock_status(threshold)) {
                (ExpiryStatus::Expired, _) => AttentionReason::Expired,
                (ExpiryStatus::Expiring, _) => AttentionReason::ExpiringSoon,
                (_, StockStatus::Out) => AttentionReason::OutOfStock,
                _ => AttentionReason::LowStock,
            };
            attention.push(AttentionRow {
                medicine_id: m.id.clone(),
                name: m.name.clone(),
                stock: m.stock,
                expiry: m.expiry,
                reason,
            });
        }

        let mut recent: Vec<&Bill> = bills.iter().collect();
        sort_newest_first(&mut recent);

        DashboardSummary {
            today: Collections::of(bills_on(bills, today)),
            month: Collections::of(bills_between(bills, month_start(today), today)),
            low_stock: low.len(),
            out_of_stock: out.len(),
            expiring: expiring.len(),
            expired,
            attention,
            recent_bills: recent.into_iter().take(RECENT_BILLS).cloned().collect(),
        }
    }
}

// =============================================================================
// Sales
// =============================================================================

/// Filter selections on the sales page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub payment: Option<PaymentMode>,
    /// Matches bill number, patient name or any item name.
    pub query: String,
}

impl SalesFilter {
    /// The page's initial state: this month up to today, all modes.
    pub fn this_month(today: NaiveDate) -> Self {
        SalesFilter {
            from: Some(month_start(today)),
            to: Some(today),
            ..Default::default()
        }
    }

    pub fn matches(&self, bill: &Bill) -> bool {
        let day = bill.day();
        if self.from.is_some_and(|from| day < from) || self.to.is_some_and(|to| day > to) {
            return false;
        }
        if self.payment.is_some_and(|mode| bill.payment_mode != mode) {
            return false;
        }
        let q = self.query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        bill.bill_no.to_lowercase().contains(&q)
            || bill.patient_name.to_lowercase().contains(&q)
            || bill.items.iter().any(|i| i.name.to_lowercase().contains(&q))
    }

    /// Matching bills, newest first.
    pub fn apply<'a>(&self, bills: &'a [Bill]) -> Vec<&'a Bill> {
        let mut hits: Vec<&Bill> = bills.iter().filter(|b| self.matches(b)).collect();
        sort_newest_first(&mut hits);
        hits
    }
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayCollections {
    pub day: NaiveDate,
    pub collections: Collections,
}

/// Cash vs UPI over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: Collections,
    pub cash_bills: usize,
    pub upi_bills: usize,
    /// Tenths of a percent.
    pub cash_share_permille: i64,
    pub upi_share_permille: i64,
    /// Days that had bills, newest first.
    pub days: Vec<DayCollections>,
}

impl PaymentSummary {
    pub fn build(bills: &[Bill], from: NaiveDate, to: NaiveDate) -> Self {
        let in_range = bills_between(bills, from, to);
        let totals = Collections::of(in_range.iter().copied());

        let mut by_day: BTreeMap<NaiveDate, Collections> = BTreeMap::new();
        for bill in &in_range {
            by_day.entry(bill.day()).or_default().add(bill);
        }

        PaymentSummary {
            from,
            to,
            totals,
            cash_bills: in_range
                .iter()
                .filter(|b| b.payment_mode == PaymentMode::Cash)
                .count(),
            upi_bills: in_range
                .iter()
                .filter(|b| b.payment_mode == PaymentMode::Upi)
                .count(),
            cash_share_permille: totals.cash.share_permille(totals.revenue),
            upi_share_permille: totals.upi.share_permille(totals.revenue),
            days: by_day
                .into_iter()
                .rev()
                .map(|(day, collections)| DayCollections { day, collections })
                .collect(),
        }
    }
}

// =============================================================================
// Revenue report
// =============================================================================

/// Period selector on the reports page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    #[default]
    Last7Days,
    Last30Days,
    /// First of the month through today.
    ThisMonth,
}

impl ReportPeriod {
    pub fn label(&self) -> &'static str {
        match self {
            ReportPeriod::Last7Days => "Last 7 Days",
            ReportPeriod::Last30Days => "Last 30 Days",
            ReportPeriod::ThisMonth => "This Month",
        }
    }

    /// Days covered, oldest first.
    pub fn days(&self, today: NaiveDate) -> Vec<NaiveDate> {
        match self {
            ReportPeriod::Last7Days => last_n_days(today, 7),
            ReportPeriod::Last30Days => last_n_days(today, 30),
            ReportPeriod::ThisMonth => last_n_days(today, today.day()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopMedicine {
    pub name: String,
    pub quantity: i64,
    pub revenue: Money,
    /// Share of the period's revenue, tenths of a percent.
    pub share_permille: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevenueReport {
    pub period: ReportPeriod,
    /// One entry per day of the period, oldest first, zero-filled.
    pub days: Vec<DayCollections>,
    pub totals: Collections,
    pub top_medicines: Vec<TopMedicine>,
}

impl RevenueReport {
    pub fn build(bills: &[Bill], period: ReportPeriod, today: NaiveDate) -> Self {
        let days = period.days(today);
        let mut by_day: BTreeMap<NaiveDate, Collections> =
            days.iter().map(|d| (*d, Collections::default())).collect();
        // Items are grouped by name, as printed on the bill
        let mut by_medicine: BTreeMap<String, (i64, Money)> = BTreeMap::new();

        for bill in bills {
            let Some(bucket) = by_day.get_mut(&bill.day()) else {
                continue;
            };
            bucket.add(bill);
            for item in &bill.items {
                let entry = by_medicine.entry(item.name.clone()).or_default();
                entry.0 += item.quantity;
                entry.1 += item.line_total();
            }
        }

        let totals = by_day.values().fold(Collections::default(), |mut acc, c| {
            acc.bills += c.bills;
            acc.revenue += c.revenue;
            acc.cash += c.cash;
            acc.upi += c.upi;
            acc
        });

        let mut top: Vec<TopMedicine> = by_medicine
            .into_iter()
            .map(|(name, (quantity, revenue))| TopMedicine {
                name,
                quantity,
                revenue,
                share_permille: revenue.share_permille(totals.revenue),
            })
            .collect();
        // Stable sort keeps alphabetical order among equal revenue
        top.sort_by(|a, b| b.revenue.cmp(&a.revenue));
        top.truncate(TOP_MEDICINES);

        RevenueReport {
            period,
            days: by_day
                .into_iter()
                .map(|(day, collections)| DayCollections { day, collections })
                .collect(),
            totals,
            top_medicines: top,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{bill_item, BillDraft};
    use crate::seed::demo_medicines;
    use chrono::{TimeZone, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bill_on(no: usize, date: NaiveDate, mode: PaymentMode, med: &Medicine, qty: i64) -> Bill {
        let at = Utc
            .with_ymd_and_hms(date.year(), date.month(), date.day(), 10, no as u32, 0)
            .unwrap();
        BillDraft {
            items: vec![bill_item(med, qty)],
            payment_mode: mode,
            discount: Money::zero(),
            patient_name: format!("Patient {}", no),
            doctor_name: String::new(),
        }
        .into_bill(format!("b{}", no), format!("BILL-{:04}", no), at)
        .unwrap()
    }

    fn ledger(today: NaiveDate) -> (Vec<Medicine>, Vec<Bill>) {
        let meds = demo_medicines(Utc::now());
        let yesterday = today.pred_opt().unwrap();
        let bills = vec![
            bill_on(1, today, PaymentMode::Cash, &meds[0], 2), // 25.00 + 1.25
            bill_on(2, today, PaymentMode::Upi, &meds[2], 3),  // 84.00 + 4.20
            bill_on(3, yesterday, PaymentMode::Cash, &meds[3], 1), // 95.00 + 11.40
            bill_on(4, day(2026, 8, 2), PaymentMode::Upi, &meds[7], 5), // 210.00
        ];
        (meds, bills)
    }

    #[test]
    fn test_last_n_days_and_month_start() {
        let today = day(2026, 3, 2);
        assert_eq!(
            last_n_days(today, 3),
            vec![day(2026, 2, 28), day(2026, 3, 1), day(2026, 3, 2)]
        );
        assert_eq!(month_start(today), day(2026, 3, 1));
        assert_eq!(ReportPeriod::ThisMonth.days(today).len(), 2);
    }

    #[test]
    fn test_dashboard_today_and_month() {
        let today = day(2026, 10, 16);
        let (meds, bills) = ledger(today);
        let dash = DashboardSummary::build(&meds, &bills, 10, today);

        assert_eq!(dash.today.bills, 2);
        assert_eq!(dash.today.cash.cents(), 2625);
        assert_eq!(dash.today.upi.cents(), 8820);
        assert_eq!(dash.month.revenue.cents(), 2625 + 8820 + 10640);
        assert_eq!(dash.recent_bills[0].bill_no, "BILL-0002");
        assert_eq!(dash.recent_bills.len(), 4);
    }

    #[test]
    fn test_dashboard_low_stock_moves_to_out_of_stock() {
        let today = day(2026, 10, 16);
        let (mut meds, bills) = ledger(today);
        let metformin = meds.iter().position(|m| m.name == "Metformin 500mg").unwrap();

        let before = DashboardSummary::build(&meds, &bills, 10, today);
        assert_eq!(before.low_stock, 3);
        assert_eq!(before.out_of_stock, 0);

        meds[metformin].stock = 0;
        let after = DashboardSummary::build(&meds, &bills, 10, today);
        assert_eq!(after.low_stock, 2);
        assert_eq!(after.out_of_stock, 1);
        assert_eq!(after.attention[0].name, "Metformin 500mg");
    }

    #[test]
    fn test_attention_list_is_deduplicated_and_capped() {
        let today = day(2026, 10, 16);
        let (mut meds, bills) = ledger(today);
        for m in meds.iter_mut() {
            m.stock = 0;
        }
        let dash = DashboardSummary::build(&meds, &bills, 10, today);
        assert_eq!(dash.attention.len(), ATTENTION_ROWS);
        let mut ids: Vec<_> = dash.attention.iter().map(|r| r.medicine_id.clone()).collect();
        ids.dedup();
        assert_eq!(ids.len(), ATTENTION_ROWS);
    }

    #[test]
    fn test_sales_filter() {
        let today = day(2026, 10, 16);
        let (_, bills) = ledger(today);

        let month = SalesFilter::this_month(today).apply(&bills);
        assert_eq!(month.len(), 3);
        assert_eq!(month[0].bill_no, "BILL-0002");

        let upi = SalesFilter {
            payment: Some(PaymentMode::Upi),
            ..Default::default()
        };
        assert_eq!(upi.apply(&bills).len(), 2);

        let by_item = SalesFilter {
            query: "atorva".into(),
            ..Default::default()
        };
        assert_eq!(by_item.apply(&bills)[0].bill_no, "BILL-0003");

        let by_patient = SalesFilter {
            query: "patient 4".into(),
            ..Default::default()
        };
        assert_eq!(by_patient.apply(&bills).len(), 1);
    }

    #[test]
    fn test_payment_summary() {
        let today = day(2026, 10, 16);
        let (_, bills) = ledger(today);
        let summary = PaymentSummary::build(&bills, month_start(today), today);

        assert_eq!(summary.totals.bills, 3);
        assert_eq!(summary.cash_bills, 2);
        assert_eq!(summary.upi_bills, 1);
        assert_eq!(summary.totals.cash.cents(), 2625 + 10640);
        assert_eq!(
            summary.cash_share_permille + summary.upi_share_permille,
            1000
        );
        assert_eq!(summary.days[0].day, today);
        assert_eq!(summary.days[0].collections.bills, 2);
        assert_eq!(summary.days.len(), 2);
    }

    #[test]
    fn test_revenue_report() {
        let today = day(2026, 10, 16);
        let (_, bills) = ledger(today);
        let report = RevenueReport::build(&bills, ReportPeriod::Last7Days, today);

        assert_eq!(report.days.len(), 7);
        assert_eq!(report.days[6].day, today);
        assert_eq!(report.days[6].collections.bills, 2);
        assert_eq!(report.totals.bills, 3);
        assert_eq!(report.top_medicines[0].name, "Atorvastatin 10mg");
        assert_eq!(report.top_medicines.len(), 3);
        assert_eq!(report.totals.average_per_bill().cents(), (2625 + 8820 + 10640) / 3);
    }
}
