//! # Commands Module
//!
//! One module per page. Every command reads what it needs from the
//! [`Counter`] context and returns the text to print.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (context, dispatch, lookups)
//! ├── dashboard.rs  ◄─── Today, this month, alerts, recent bills
//! ├── billing.rs    ◄─── Cart, search, submit, receipt
//! ├── stock.rs      ◄─── Catalog table, add/edit/restock/delete
//! ├── sales.rs      ◄─── Bill history, view, reprint
//! ├── payments.rs   ◄─── Cash vs UPI over a range
//! ├── reports.rs    ◄─── Revenue by day, top medicines
//! ├── settings.rs   ◄─── Shop details, endpoint, sync, backups
//! └── config.rs     ◄─── Counter config file (show, init)
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "stock list --status low"                                              │
//! │         │                                                               │
//! │         │ clap (cli.rs)                                                 │
//! │         ▼                                                               │
//! │  Command::Stock { action: Some(StockCommand::List(..)) }                │
//! │         │                                                               │
//! │         │ execute()                                                     │
//! │         ▼                                                               │
//! │  stock::list(&counter.store, &mut counter.session, ..)                  │
//! │         │                                                               │
//! │         │ cache-only reads, session filters updated                     │
//! │         ▼                                                               │
//! │  CliResult<String> ──► printed by main.rs or the shell                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Page views read the cache only. The network is touched by writes (which
//! mirror to the endpoint) and by the explicit sync actions in settings.

pub mod billing;
pub mod config;
pub mod dashboard;
pub mod payments;
pub mod reports;
pub mod sales;
pub mod settings;
pub mod stock;

use chrono::{NaiveDate, Utc};
use std::path::PathBuf;
use std::sync::Arc;

use pharma_core::{Bill, Medicine};
use pharma_sync::DataStore;

use crate::cli::Command;
use crate::debounce::Debouncer;
use crate::error::{CliError, CliResult};
use crate::state::{AppConfig, SessionState};

/// Everything a command may need.
pub struct Counter {
    pub store: Arc<DataStore>,
    pub config: AppConfig,
    /// `--config` as given; `None` means the platform default.
    pub config_path: Option<PathBuf>,
    pub session: SessionState,
    /// Present in the shell: `settings sync` is coalesced and runs in the
    /// background. Absent in one-shot mode, where it runs inline.
    pub sync_debouncer: Option<Debouncer>,
}

impl Counter {
    pub fn new(store: Arc<DataStore>, config: AppConfig) -> Self {
        Counter {
            store,
            config,
            config_path: None,
            session: SessionState::new(today()),
            sync_debouncer: None,
        }
    }

    pub fn with_sync_debouncer(mut self) -> Self {
        self.sync_debouncer = Some(Debouncer::new(self.config.sync_debounce()));
        self
    }
}

/// Runs a page command and returns its output.
pub async fn execute(counter: &mut Counter, command: Command) -> CliResult<String> {
    if let Some(page) = command.page() {
        counter.session.navigate(page);
    }

    match command {
        Command::Dashboard => dashboard::show(&counter.store).await,
        Command::Billing { action } => billing::run(counter, action).await,
        Command::Stock { action } => stock::run(counter, action).await,
        Command::Sales { action } => sales::run(counter, action).await,
        Command::Payments(args) => payments::show(&counter.store, &mut counter.session, args).await,
        Command::Reports(args) => reports::show(&counter.store, &mut counter.session, args).await,
        Command::Settings { action } => settings::run(counter, action).await,
        Command::Config { action } => config::run(counter, action),
        Command::Shell => Err(CliError::validation("Already in the shell")),
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// First 8 characters of an id, enough to type back.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Finds a medicine by id, unique id prefix (4+ characters) or exact name.
pub(crate) fn find_medicine<'a>(medicines: &'a [Medicine], reference: &str) -> CliResult<&'a Medicine> {
    let reference = reference.trim();
    if let Some(m) = medicines.iter().find(|m| m.id == reference) {
        return Ok(m);
    }
    if let Some(m) = medicines
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(reference))
    {
        return Ok(m);
    }
    if reference.len() >= 4 {
        let mut hits = medicines.iter().filter(|m| m.id.starts_with(reference));
        if let (Some(m), None) = (hits.next(), hits.next()) {
            return Ok(m);
        }
    }
    Err(CliError::not_found("Medicine", reference))
}

/// Finds a bill by id, unique id prefix or bill number (`BILL-0003`).
pub(crate) fn find_bill<'a>(bills: &'a [Bill], reference: &str) -> CliResult<&'a Bill> {
    let reference = reference.trim();
    if let Some(b) = bills
        .iter()
        .find(|b| b.id == reference || b.bill_no.eq_ignore_ascii_case(reference))
    {
        return Ok(b);
    }
    if reference.len() >= 4 {
        let mut hits = bills.iter().filter(|b| b.id.starts_with(reference));
        if let (Some(b), None) = (hits.next(), hits.next()) {
            return Ok(b);
        }
    }
    Err(CliError::not_found("Bill", reference))
}

/// `123` tenths of a percent as `12.3%`.
pub(crate) fn permille_label(permille: i64) -> String {
    format!("{}.{}%", permille / 10, (permille % 10).abs())
}


#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::seed::demo_medicines;

    #[test]
    fn test_find_medicine_by_id_name_and_prefix() {
        let meds = demo_medicines(Utc::now());
        let target = &meds[3];

        assert_eq!(find_medicine(&meds, &target.id).unwrap().id, target.id);
        assert_eq!(
            find_medicine(&meds, "atorvastatin 10MG").unwrap().id,
            target.id
        );
        assert_eq!(find_medicine(&meds, &target.id[..8]).unwrap().id, target.id);
        assert!(find_medicine(&meds, "abc").is_err());
        assert!(find_medicine(&meds, "Crocin").is_err());
    }

    #[test]
    fn test_permille_label() {
        assert_eq!(permille_label(625), "62.5%");
        assert_eq!(permille_label(1000), "100.0%");
        assert_eq!(permille_label(0), "0.0%");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0f6c2a1e-aaaa"), "0f6c2a1e");
        assert_eq!(short_id("r1"), "r1");
    }

    #[tokio::test]
    async fn test_page_commands_navigate() {
        let mut counter = testing::seeded_counter().await;
        execute(&mut counter, Command::Sales { action: None })
            .await
            .unwrap();
        assert_eq!(counter.session.page, crate::state::Page::Sales);

        let err = execute(&mut counter, Command::Shell).await.unwrap_err();
        assert_eq!(err.message, "Already in the shell");
    }
}
