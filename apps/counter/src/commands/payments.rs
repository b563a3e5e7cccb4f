//! Payments page: cash against UPI over a date range.

use std::fmt;

use pharma_core::format::{currency, format_date};
use pharma_core::reports::PaymentSummary;
use pharma_sync::DataStore;

use super::permille_label;
use crate::cli::PaymentsArgs;
use crate::error::{CliError, CliResult};
use crate::state::SessionState;

pub async fn show(store: &DataStore, session: &mut SessionState, args: PaymentsArgs) -> CliResult<String> {
    let from = args.from.unwrap_or(session.payments_from);
    let to = args.to.unwrap_or(session.payments_to);
    if from > to {
        return Err(CliError::validation("From date is after to date"));
    }
    session.payments_from = from;
    session.payments_to = to;

    let bills = store.bills_cached().await;
    let settings = store.settings().await;
    let summary = PaymentSummary::build(&bills, from, to);
    Ok(PaymentsView {
        summary: &summary,
        symbol: &settings.currency,
    }
    .to_string())
}

struct PaymentsView<'a> {
    summary: &'a PaymentSummary,
    symbol: &'a str,
}

impl fmt::Display for PaymentsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.summary;
        let money = |m| currency(m, self.symbol);

        writeln!(f, "Payments   {} to {}", format_date(s.from), format_date(s.to))?;
        writeln!(f)?;
        writeln!(
            f,
            "  Cash  {:>12}  {:>6}  {} bills",
            money(s.totals.cash),
            permille_label(s.cash_share_permille),
            s.cash_bills
        )?;
        writeln!(
            f,
            "  UPI   {:>12}  {:>6}  {} bills",
            money(s.totals.upi),
            permille_label(s.upi_share_permille),
            s.upi_bills
        )?;
        writeln!(f, "  Total {:>12}          {} bills", money(s.totals.revenue), s.totals.bills)?;
        writeln!(f)?;

        if s.days.is_empty() {
            return write!(f, "  No bills in this range");
        }
        writeln!(
            f,
            "  {:<12} {:>6} {:>12} {:>12} {:>12}",
            "Day", "Bills", "Cash", "UPI", "Total"
        )?;
        for day in &s.days {
            let c = &day.collections;
            writeln!(
                f,
                "  {:<12} {:>6} {:>12} {:>12} {:>12}",
                format_date(day.day),
                c.bills,
                money(c.cash),
                money(c.upi),
                money(c.revenue)
            )?;
        }
        Ok(())
    }
}
