//! # Session State
//!
//! Everything the counter remembers between two commands of one shell
//! session: the page on screen, the bill being built and each page's
//! filter selections. Nothing here is persisted.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SessionState                                                           │
//! │                                                                         │
//! │  page ─────────── Dashboard | Billing | Stock | Sales | ...             │
//! │                                                                         │
//! │  bill in progress                                                       │
//! │    cart, payment mode, discount, patient, doctor, last search           │
//! │                                                                         │
//! │  page filters                                                           │
//! │    stock: query/category/status + page                                  │
//! │    sales: date range/mode/query + page                                  │
//! │    payments: date range      reports: period                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

use pharma_core::catalog::StockFilter;
use pharma_core::cart::Cart;
use pharma_core::reports::{month_start, ReportPeriod, SalesFilter};
use pharma_core::{Money, PaymentMode};

/// A screen of the counter app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Page {
    #[default]
    Dashboard,
    Billing,
    Stock,
    Sales,
    Payments,
    Reports,
    Settings,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Dashboard,
        Page::Billing,
        Page::Stock,
        Page::Sales,
        Page::Payments,
        Page::Reports,
        Page::Settings,
    ];

    /// Header title.
    pub fn title(&self) -> &'static str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Billing => "New Bill",
            Page::Stock => "Stock",
            Page::Sales => "Sales",
            Page::Payments => "Payments",
            Page::Reports => "Reports",
            Page::Settings => "Settings",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Billing => "billing",
            Page::Stock => "stock",
            Page::Sales => "sales",
            Page::Payments => "payments",
            Page::Reports => "reports",
            Page::Settings => "settings",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Page {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Page::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown page: {}", s))
    }
}

/// The bill being built on the billing page.
#[derive(Debug, Clone, Default)]
pub struct BillInProgress {
    pub cart: Cart,
    pub payment_mode: PaymentMode,
    pub discount: Money,
    pub patient_name: String,
    pub doctor_name: String,
    /// Medicine ids from the last search, so `add 2` picks the second hit.
    pub last_search: Vec<String>,
}

impl BillInProgress {
    /// Back to an empty Cash bill after a successful submit.
    pub fn reset(&mut self) {
        *self = BillInProgress::default();
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub page: Page,
    pub bill: BillInProgress,

    pub stock_filter: StockFilter,
    pub stock_page: usize,

    pub sales_filter: SalesFilter,
    pub sales_page: usize,

    pub payments_from: NaiveDate,
    pub payments_to: NaiveDate,

    pub report_period: ReportPeriod,
}

impl SessionState {
    /// A fresh session: dashboard, empty cart, this month on the date pickers.
    pub fn new(today: NaiveDate) -> Self {
        SessionState {
            page: Page::Dashboard,
            bill: BillInProgress::default(),
            stock_filter: StockFilter::default(),
            stock_page: 1,
            sales_filter: SalesFilter::this_month(today),
            sales_page: 1,
            payments_from: month_start(today),
            payments_to: today,
            report_period: ReportPeriod::default(),
        }
    }

    /// Switches page. Returns whether it changed.
    pub fn navigate(&mut self, page: Page) -> bool {
        let changed = self.page != page;
        self.page = page;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_new_session_defaults() {
        let session = SessionState::new(today());
        assert_eq!(session.page, Page::Dashboard);
        assert!(session.bill.cart.is_empty());
        assert_eq!(session.bill.payment_mode, PaymentMode::Cash);
        assert_eq!(
            session.sales_filter.from,
            NaiveDate::from_ymd_opt(2026, 10, 1)
        );
        assert_eq!(session.payments_to, today());
        assert_eq!(session.report_period, ReportPeriod::Last7Days);
    }

    #[test]
    fn test_reset_bill() {
        let mut session = SessionState::new(today());
        session.bill.payment_mode = PaymentMode::Upi;
        session.bill.patient_name = "Ravi".into();
        session.bill.discount = Money::from_cents(500);
        session.bill.reset();

        assert_eq!(session.bill.payment_mode, PaymentMode::Cash);
        assert!(session.bill.patient_name.is_empty());
        assert_eq!(session.bill.discount, Money::zero());
    }

    #[test]
    fn test_page_parsing() {
        assert_eq!("Stock".parse::<Page>().unwrap(), Page::Stock);
        assert_eq!(Page::Billing.title(), "New Bill");
        assert!("inventory".parse::<Page>().is_err());

        let mut session = SessionState::new(today());
        assert!(session.navigate(Page::Reports));
        assert!(!session.navigate(Page::Reports));
    }
}
