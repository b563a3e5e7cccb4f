//! # Command Line Interface
//!
//! One clap tree serves both entry points:
//!
//! ```text
//! pharmacy stock list --status low        one-shot: parse argv, run, exit
//! pharmacy                                shell: read a line, split it,
//! pharmacy> stock list --status low         parse it with ShellLine, run
//! ```

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use pharma_core::catalog::StatusFilter;
use pharma_core::reports::ReportPeriod;
use pharma_core::types::{ExpiryMonth, TaxRate};
use pharma_core::{Money, PaymentMode};

use crate::state::Page;

#[derive(Debug, Parser)]
#[command(name = "pharmacy", version, about = "Pharmacy point of sale and stock tracker")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Without a command, the interactive shell starts
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Today's takings, stock alerts and recent bills
    Dashboard,

    /// Build and submit a bill
    Billing {
        #[command(subcommand)]
        action: Option<BillingCommand>,
    },

    /// Medicine catalog and stock levels
    Stock {
        #[command(subcommand)]
        action: Option<StockCommand>,
    },

    /// Bill history
    Sales {
        #[command(subcommand)]
        action: Option<SalesCommand>,
    },

    /// Cash and UPI collections over a date range
    Payments(PaymentsArgs),

    /// Revenue by day and top medicines
    Reports(ReportsArgs),

    /// Shop details, endpoint, sync and backups
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },

    /// Counter configuration file
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommand>,
    },

    /// Start the interactive shell
    Shell,
}

impl Command {
    /// The page a command belongs to, if any.
    pub fn page(&self) -> Option<Page> {
        match self {
            Command::Dashboard => Some(Page::Dashboard),
            Command::Billing { .. } => Some(Page::Billing),
            Command::Stock { .. } => Some(Page::Stock),
            Command::Sales { .. } => Some(Page::Sales),
            Command::Payments(_) => Some(Page::Payments),
            Command::Reports(_) => Some(Page::Reports),
            Command::Settings { .. } => Some(Page::Settings),
            Command::Config { .. } | Command::Shell => None,
        }
    }
}

// =============================================================================
// Shell
// =============================================================================

/// One line typed at the shell prompt.
#[derive(Debug, Parser)]
#[command(name = "pharmacy", no_binary_name = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ShellCommand {
    #[command(flatten)]
    Run(Command),

    /// Show a page
    Go { page: Page },

    /// Leave the shell
    #[command(visible_alias = "quit")]
    Exit,
}

// =============================================================================
// Billing
// =============================================================================

#[derive(Debug, Clone, Subcommand)]
pub enum BillingCommand {
    /// Show the bill in progress
    Show,

    /// Search medicines to add (up to 8 results)
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Add one unit: a search result number, a medicine id or an exact name
    Add { medicine: String },

    /// One more of a cart line
    Inc { line: usize },

    /// One less of a cart line (removes it at zero)
    Dec { line: usize },

    /// Set a cart line's quantity (clamped to what is in stock)
    Qty { line: usize, quantity: i64 },

    /// Remove a cart line
    Remove { line: usize },

    /// Empty the cart and reset the bill
    Clear,

    /// Payment mode
    Payment { mode: PaymentMode },

    /// Discount on the whole bill
    Discount {
        #[arg(value_parser = parse_money)]
        amount: Money,
    },

    /// Patient name (empty to clear)
    Patient {
        #[arg(num_args = 0..)]
        name: Vec<String>,
    },

    /// Doctor name (empty to clear)
    Doctor {
        #[arg(num_args = 0..)]
        name: Vec<String>,
    },

    /// Record the bill and print the receipt
    Submit(SubmitArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct SubmitArgs {
    /// Add to the cart first: `<medicine>` or `<medicine>:<qty>`
    #[arg(long = "item", value_name = "MEDICINE[:QTY]")]
    pub items: Vec<String>,

    /// Payment mode for this bill
    #[arg(long)]
    pub payment: Option<PaymentMode>,

    /// Also write an HTML receipt to this file
    #[arg(long, value_name = "PATH")]
    pub html: Option<PathBuf>,
}

// =============================================================================
// Stock
// =============================================================================

#[derive(Debug, Clone, Subcommand)]
pub enum StockCommand {
    /// List medicines (filters stick for the session)
    List(StockListArgs),

    /// One medicine in full
    Show { medicine: String },

    /// Add a medicine
    Add(MedicineFields),

    /// Change some fields of a medicine
    Edit {
        medicine: String,
        #[command(flatten)]
        fields: MedicineFields,
    },

    /// Receive new stock
    Restock(RestockArgs),

    /// Delete a medicine
    Delete { medicine: String },
}

#[derive(Debug, Clone, Default, Args)]
pub struct StockListArgs {
    /// Matches name, generic, manufacturer or batch
    #[arg(long, short)]
    pub query: Option<String>,

    #[arg(long, short)]
    pub category: Option<String>,

    #[arg(long, short)]
    pub status: Option<StatusArg>,

    #[arg(long, short)]
    pub page: Option<usize>,

    /// Clear all filters first
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Ok,
    Low,
    Out,
    Expiring,
}

impl From<StatusArg> for StatusFilter {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Ok => StatusFilter::Ok,
            StatusArg::Low => StatusFilter::Low,
            StatusArg::Out => StatusFilter::Out,
            StatusArg::Expiring => StatusFilter::Expiring,
        }
    }
}

/// Medicine form fields. Omitted fields keep their current value on edit.
#[derive(Debug, Clone, Default, Args)]
pub struct MedicineFields {
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub generic: Option<String>,

    #[arg(long)]
    pub manufacturer: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub unit: Option<String>,

    #[arg(long)]
    pub stock: Option<i64>,

    #[arg(long, value_parser = parse_money)]
    pub mrp: Option<Money>,

    #[arg(long, value_parser = parse_money)]
    pub cost: Option<Money>,

    /// GST percent
    #[arg(long, value_parser = parse_percent)]
    pub gst: Option<TaxRate>,

    #[arg(long)]
    pub batch: Option<String>,

    /// YYYY-MM
    #[arg(long)]
    pub expiry: Option<ExpiryMonth>,

    /// Drug schedule tag such as H or H1 (empty to clear)
    #[arg(long)]
    pub schedule: Option<String>,

    #[arg(long)]
    pub hsn: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct RestockArgs {
    pub medicine: String,

    /// Units received
    #[arg(long)]
    pub qty: i64,

    /// Expiry of the new stock, YYYY-MM
    #[arg(long)]
    pub expiry: String,

    #[arg(long)]
    pub batch: Option<String>,

    #[arg(long, value_parser = parse_money)]
    pub cost: Option<Money>,
}

// =============================================================================
// Sales, payments, reports
// =============================================================================

#[derive(Debug, Clone, Subcommand)]
pub enum SalesCommand {
    /// List bills (filters stick for the session)
    List(SalesListArgs),

    /// One bill in full
    View { bill: String },

    /// Print a bill's receipt again
    Reprint {
        bill: String,

        /// Also write an HTML receipt to this file
        #[arg(long, value_name = "PATH")]
        html: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct SalesListArgs {
    /// YYYY-MM-DD
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub payment: Option<PaymentMode>,

    /// Matches bill number, patient or item names
    #[arg(long, short)]
    pub query: Option<String>,

    #[arg(long, short)]
    pub page: Option<usize>,

    /// Back to this month, all modes, no query
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct PaymentsArgs {
    /// YYYY-MM-DD (default: first of this month)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// YYYY-MM-DD (default: today)
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ReportsArgs {
    #[arg(long, short)]
    pub period: Option<PeriodArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PeriodArg {
    #[value(name = "7days")]
    Last7Days,
    #[value(name = "30days")]
    Last30Days,
    Month,
}

impl From<PeriodArg> for ReportPeriod {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Last7Days => ReportPeriod::Last7Days,
            PeriodArg::Last30Days => ReportPeriod::Last30Days,
            PeriodArg::Month => ReportPeriod::ThisMonth,
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

#[derive(Debug, Clone, Subcommand)]
pub enum SettingsCommand {
    /// Shop details and sync status
    Show,

    /// Change shop details
    Save(ShopFields),

    /// Set the endpoint URL (omit to disconnect)
    Endpoint { url: Option<String> },

    /// Check the endpoint answers and count its medicines
    Test,

    /// Send queued writes, then refresh from the endpoint
    Sync,

    /// Upload every local record to the endpoint
    Push {
        #[arg(long)]
        yes: bool,
    },

    /// Send queued writes now
    Flush,

    /// Queue given-up writes again
    Retry,

    /// Write a backup file
    Export {
        /// File or directory (default: current directory)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },

    /// Replace local data from a backup file
    Import { path: PathBuf },

    /// Delete all local data, then load the demo catalog
    Clear {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the configuration in effect and the file it is read from
    Show,

    /// Write the configuration in effect to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct ShopFields {
    #[arg(long)]
    pub shop_name: Option<String>,

    #[arg(long)]
    pub address: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// GSTIN
    #[arg(long)]
    pub gst_number: Option<String>,

    /// Drug license number
    #[arg(long)]
    pub license_no: Option<String>,

    /// Low-stock threshold (anything but a positive number means 10)
    #[arg(long)]
    pub threshold: Option<String>,

    #[arg(long)]
    pub currency: Option<String>,
}

// =============================================================================
// Value parsers
// =============================================================================

fn parse_money(text: &str) -> Result<Money, String> {
    Money::parse_major(text).ok_or_else(|| format!("'{}' is not an amount", text))
}

fn parse_percent(text: &str) -> Result<TaxRate, String> {
    TaxRate::parse_percent(text).ok_or_else(|| format!("'{}' is not a percentage", text))
}

/// Splits a shell line into words. Single or double quotes group words;
/// a backslash escapes the next character.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                let next = chars.next().ok_or("Line ends with a backslash")?;
                current.push(next);
                in_word = true;
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("Unclosed quote".to_string());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
