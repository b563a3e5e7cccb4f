//! Dashboard page: today's and this month's takings, stock alerts and the
//! latest bills.

use std::fmt;

use pharma_core::format::{currency, fit, format_datetime};
use pharma_core::reports::DashboardSummary;
use pharma_sync::DataStore;

use super::today;
use crate::error::CliResult;

pub async fn show(store: &DataStore) -> CliResult<String> {
    let medicines = store.medicines_cached().await;
    let bills = store.bills_cached().await;
    let settings = store.settings().await;

    let summary = DashboardSummary::build(&medicines, &bills, settings.threshold(), today());
    Ok(DashboardView {
        summary: &summary,
        symbol: &settings.currency,
    }
    .to_string())
}

struct DashboardView<'a> {
    summary: &'a DashboardSummary,
    symbol: &'a str,
}

impl fmt::Display for DashboardView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        let money = |m| currency(m, self.symbol);

        writeln!(f, "Dashboard")?;
        writeln!(f)?;
        writeln!(
            f,
            "  Today       {:>12}   {} bills   cash {}  upi {}",
            money(s.today.revenue),
            s.today.bills,
            money(s.today.cash),
            money(s.today.upi)
        )?;
        writeln!(
            f,
            "  This month  {:>12}   {} bills   avg {}",
            money(s.month.revenue),
            s.month.bills,
            money(s.month.average_per_bill())
        )?;
        writeln!(
            f,
            "  Stock       {} low, {} out, {} expiring, {} expired",
            s.low_stock, s.out_of_stock, s.expiring, s.expired
        )?;

        writeln!(f)?;
        writeln!(f, "Needs attention")?;
        if s.attention.is_empty() {
            writeln!(f, "  Nothing needs attention")?;
        }
        for row in &s.attention {
            let expiry = row
                .expiry
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                f,
                "  {} {:>5}  {:<7}  {}",
                fit(&row.name, 28),
                row.stock,
                expiry,
                row.reason.label()
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Recent bills")?;
        if s.recent_bills.is_empty() {
            writeln!(f, "  No bills yet")?;
        }
        for bill in &s.recent_bills {
            writeln!(
                f,
                "  {:<10} {:<22} {:<4} {:>12}",
                bill.bill_no,
                format_datetime(Some(bill.created_at)),
                bill.payment_mode.as_str(),
                money(bill.grand_total())
            )?;
        }
        Ok(())
    }
}
