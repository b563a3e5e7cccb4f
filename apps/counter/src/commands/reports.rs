//! Reports page: revenue per day as text bars, and the best sellers.

use std::fmt;

use pharma_core::format::{bar, currency, fit, format_date};
use pharma_core::reports::RevenueReport;
use pharma_core::Money;
use pharma_sync::DataStore;

use super::{permille_label, today};
use crate::cli::ReportsArgs;
use crate::error::CliResult;
use crate::state::SessionState;

/// Widest bar in the daily chart, in cells.
const BAR_WIDTH: usize = 30;

pub async fn show(store: &DataStore, session: &mut SessionState, args: ReportsArgs) -> CliResult<String> {
    if let Some(period) = args.period {
        session.report_period = period.into();
    }

    let bills = store.bills_cached().await;
    let settings = store.settings().await;
    let report = RevenueReport::build(&bills, session.report_period, today());
    Ok(ReportView {
        report: &report,
        symbol: &settings.currency,
    }
    .to_string())
}

struct ReportView<'a> {
    report: &'a RevenueReport,
    symbol: &'a str,
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.report;
        let money = |m| currency(m, self.symbol);

        writeln!(f, "Reports   {}", r.period.label())?;
        writeln!(
            f,
            "  Revenue {}   {} bills   avg {}   cash {}   upi {}",
            money(r.totals.revenue),
            r.totals.bills,
            money(r.totals.average_per_bill()),
            money(r.totals.cash),
            money(r.totals.upi)
        )?;
        writeln!(f)?;

        let peak = r
            .days
            .iter()
            .map(|d| d.collections.revenue)
            .max()
            .unwrap_or(Money::zero());
        writeln!(f, "Revenue by day")?;
        for day in &r.days {
            let c = &day.collections;
            writeln!(
                f,
                "  {:<12} {:>12} {:>3}  {}",
                format_date(day.day),
                money(c.revenue),
                c.bills,
                bar(c.revenue, peak, BAR_WIDTH)
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Top medicines")?;
        if r.top_medicines.is_empty() {
            return write!(f, "  No sales in this period");
        }
        for (n, top) in r.top_medicines.iter().enumerate() {
            writeln!(
                f,
                "  {:>2}. {} {:>5} units {:>12} {:>6}",
                n + 1,
                fit(&top.name, 26),
                top.quantity,
                money(top.revenue),
                permille_label(top.share_permille)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::PeriodArg;
    use crate::commands::testing::seeded_counter;
    use pharma_core::reports::ReportPeriod;

    #[tokio::test]
    async fn test_default_week_report() {
        let mut counter = seeded_counter().await;
        let out = show(&counter.store, &mut counter.session, ReportsArgs::default())
            .await
            .unwrap();

        assert!(out.starts_with("Reports   Last 7 Days"));
        assert!(out.contains("4 bills"));
        assert!(out.contains('█'));
        // Vitamin D3: 5 × 42.00, the biggest line in the seed bills
        assert!(out.contains(" 1. Vitamin D3 60K"));
    }

    #[tokio::test]
    async fn test_period_sticks() {
        let mut counter = seeded_counter().await;
        let out = show(
            &counter.store,
            &mut counter.session,
            ReportsArgs {
                period: Some(PeriodArg::Last30Days),
            },
        )
        .await
        .unwrap();
        assert!(out.starts_with("Reports   Last 30 Days"));
        assert_eq!(counter.session.report_period, ReportPeriod::Last30Days);

        let out = show(&counter.store, &mut counter.session, ReportsArgs::default())
            .await
            .unwrap();
        assert!(out.starts_with("Reports   Last 30 Days"));
    }
}
