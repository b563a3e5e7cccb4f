//! # pharma-core: Pure Business Logic for the Pharmacy POS
//!
//! Everything here is deterministic: no database, no network, no clock.
//! Functions that depend on "today" take it as an argument.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pharmacy POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            apps/counter (CLI + interactive shell)               │   │
//! │  │   dashboard ─ billing ─ stock ─ sales ─ payments ─ reports      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       pharma-sync (DataStore facade + remote client)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │       pharma-db (SQLite cache store + write outbox)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pharma-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   types   money   cart   billing   catalog   reports            │   │
//! │  │   validation   format   receipt   page   seed                   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Medicine, Bill, Settings and their small value types
//! - [`money`] - Money type with integer arithmetic (paise, never floats)
//! - [`cart`] - In-progress bill with stock-aware quantity rules
//! - [`billing`] - Bill totals, numbering and stock deduction
//! - [`catalog`] - Medicine search, filters, alternatives, stock stats
//! - [`reports`] - Dashboard, sales, payments and revenue aggregation
//! - [`validation`] - Input rules for forms
//! - [`format`] - Currency/date formatting and HTML escaping
//! - [`page`] - Fixed-size pagination for the tables
//! - [`receipt`] - Printable bill in text and HTML
//! - [`seed`] - Demo catalog for a fresh install
//!
//! ## Example Usage
//!
//! ```rust
//! use pharma_core::money::Money;
//! use pharma_core::types::TaxRate;
//!
//! let line = Money::from_cents(1250).multiply_quantity(2); // ₹25.00
//! let tax = line.calculate_tax(TaxRate::from_percent(5));
//! assert_eq!(tax.cents(), 125);
//! ```

pub mod billing;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod format;
pub mod money;
pub mod page;
pub mod receipt;
pub mod reports;
pub mod seed;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Low-stock threshold used when settings carry none.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 10;

/// How far ahead (in months) a medicine counts as "expiring soon".
pub const EXPIRY_WARNING_MONTHS: u32 = 3;
