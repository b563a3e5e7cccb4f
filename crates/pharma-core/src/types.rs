//! # Domain Types
//!
//! Core domain types used throughout the pharmacy POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Medicine     │   │      Bill       │   │    Settings     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  shop identity  │       │
//! │  │  name, generic  │   │  bill_no        │   │  threshold      │       │
//! │  │  stock (≥ 0)    │   │  items[] ───────┼─► BillItem snapshot │       │
//! │  │  mrp_cents      │   │  payment_mode   │   │  currency       │       │
//! │  │  expiry (Y-M)   │   │  totals         │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  TaxRate (bps)   ExpiryMonth (YYYY-MM)   PaymentMode (Cash | UPI)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! These are the shapes stored in the local cache and in backup files.
//! The spreadsheet endpoint uses a different, stringly shape that is
//! converted at the sync boundary.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{DEFAULT_LOW_STOCK_THRESHOLD, EXPIRY_WARNING_MONTHS};

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so the GST slabs are 0, 500, 1200, 1800 and 2800.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a whole percentage.
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        TaxRate(pct * 100)
    }

    /// Parses a percentage written as text (`"5"`, `"12.5"`).
    ///
    /// Negative values are rejected.
    pub fn parse_percent(input: &str) -> Option<TaxRate> {
        // Two decimal places of a percent are exactly basis points
        let scaled = Money::parse_major(input)?.cents();
        u32::try_from(scaled).ok().map(TaxRate)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Renders the rate as a percentage without trailing zeros: `5`, `12.5`.
    pub fn percent_label(&self) -> String {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        match frac {
            0 => whole.to_string(),
            f if f % 10 == 0 => format!("{}.{}", whole, f / 10),
            f => format!("{}.{:02}", whole, f),
        }
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Standard GST slabs offered on the medicine form.
pub const GST_SLABS: [u32; 5] = [0, 5, 12, 18, 28];

/// Medicine categories offered on the stock form and filter.
pub const CATEGORIES: [&str; 16] = [
    "Analgesic",
    "Antibiotic",
    "Antidiabetic",
    "Cardiac",
    "Antacid",
    "Antihistamine",
    "Supplement",
    "Antihypertensive",
    "Antifungal",
    "Antiviral",
    "Dermatology",
    "Eye/Ear Drops",
    "Syrup",
    "Injection",
    "Ointment",
    "Other",
];

/// Dispensing units offered on the stock form.
pub const UNITS: [&str; 9] = [
    "Strip",
    "Bottle",
    "Capsule",
    "Tablet",
    "Vial",
    "Tube",
    "Sachet",
    "Injection",
    "Other",
];

/// Unit used when a form leaves it blank.
pub const DEFAULT_UNIT: &str = "Strip";

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

// =============================================================================
// Expiry Month
// =============================================================================

/// Expiry date with month precision, written `YYYY-MM`.
///
/// Ordering is chronological, so "expired" is simply `expiry < current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryMonth {
    year: i32,
    month: u32,
}

impl ExpiryMonth {
    /// Builds a month, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(ExpiryMonth { year, month })
    }

    /// The month a calendar date falls in.
    pub fn of(date: NaiveDate) -> Self {
        ExpiryMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Adds whole months, rolling the year over.
    pub fn plus_months(&self, months: u32) -> Self {
        let zero_based = self.month - 1 + months;
        ExpiryMonth {
            year: self.year + (zero_based / 12) as i32,
            month: zero_based % 12 + 1,
        }
    }
}

impl fmt::Display for ExpiryMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Accepts `YYYY-MM`, and also full dates or timestamps that start with it
/// (spreadsheets like to turn a month cell into `2026-12-01T00:00:00.000Z`).
impl FromStr for ExpiryMonth {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "expiry".to_string(),
            reason: format!("expected YYYY-MM, got '{}'", s),
        };

        let s = s.trim();
        let head = s.get(..7).ok_or_else(invalid)?;
        let rest = &s[7..];
        if !(rest.is_empty() || rest.starts_with('-') || rest.starts_with('T')) {
            return Err(invalid());
        }

        let (year, month) = head.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        ExpiryMonth::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for ExpiryMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpiryMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Blank expiry text means "no expiry recorded".
fn deserialize_optional_expiry<'de, D>(deserializer: D) -> Result<Option<ExpiryMonth>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// Where a medicine's on-hand quantity sits relative to the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// More than the low-stock threshold.
    Ok,
    /// Between 1 and the threshold, inclusive.
    Low,
    /// Nothing on hand.
    Out,
}

/// Where a medicine's expiry sits relative to the current month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    /// Expires within the warning window (this month included).
    Expiring,
    Valid,
    /// No expiry recorded.
    Unknown,
}

/// A medicine in the shop's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Medicine {
    /// Identity, assigned at creation.
    pub id: String,

    /// Display name (`Paracetamol 500mg`).
    pub name: String,

    /// Generic (salt) name, used to suggest alternatives.
    #[serde(default)]
    pub generic: String,

    #[serde(default)]
    pub manufacturer: String,

    #[serde(default)]
    pub category: String,

    /// Dispensing unit (Strip, Bottle, ...).
    #[serde(default = "default_unit")]
    pub unit: String,

    /// On-hand quantity. Never negative once written.
    #[serde(default)]
    pub stock: i64,

    /// Retail price (MRP) in paise.
    #[serde(default)]
    pub mrp_cents: i64,

    /// Purchase price in paise.
    #[serde(default)]
    pub cost_price_cents: i64,

    /// GST rate in basis points.
    #[serde(default)]
    pub tax_rate_bps: u32,

    #[serde(default)]
    pub batch: String,

    #[serde(default, deserialize_with = "deserialize_optional_expiry")]
    pub expiry: Option<ExpiryMonth>,

    /// Drug schedule tag (H, H1, X) when the medicine is regulated.
    #[serde(default)]
    pub drug_schedule: Option<String>,

    /// HSN code printed on tax invoices.
    #[serde(default)]
    pub hsn: String,

    #[serde(default)]
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Medicine {
    pub fn mrp(&self) -> Money {
        Money::from_cents(self.mrp_cents)
    }

    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    /// Stock status against the low-stock threshold.
    pub fn stock_status(&self, threshold: i64) -> StockStatus {
        if self.stock <= 0 {
            StockStatus::Out
        } else if self.stock <= threshold {
            StockStatus::Low
        } else {
            StockStatus::Ok
        }
    }

    /// Expiry status for the given current month.
    pub fn expiry_status(&self, current: ExpiryMonth) -> ExpiryStatus {
        let Some(expiry) = self.expiry else {
            return ExpiryStatus::Unknown;
        };
        if expiry < current {
            ExpiryStatus::Expired
        } else if expiry <= current.plus_months(EXPIRY_WARNING_MONTHS) {
            ExpiryStatus::Expiring
        } else {
            ExpiryStatus::Valid
        }
    }

    /// Value of the on-hand quantity at cost.
    pub fn stock_value(&self) -> Money {
        self.cost_price().multiply_quantity(self.stock.max(0))
    }
}

/// Input for creating a medicine (the add form).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicineDraft {
    pub name: String,
    pub generic: String,
    pub manufacturer: String,
    pub category: String,
    pub unit: String,
    pub stock: i64,
    pub mrp_cents: i64,
    pub cost_price_cents: i64,
    pub tax_rate_bps: u32,
    pub batch: String,
    pub expiry: Option<ExpiryMonth>,
    pub drug_schedule: Option<String>,
    pub hsn: String,
}

impl MedicineDraft {
    /// Materializes the draft with an identity and creation time.
    ///
    /// Stock is clamped at zero and a blank unit becomes the default unit.
    pub fn into_medicine(self, id: String, now: DateTime<Utc>) -> Medicine {
        let unit = if self.unit.trim().is_empty() {
            default_unit()
        } else {
            self.unit.trim().to_string()
        };
        Medicine {
            id,
            name: self.name.trim().to_string(),
            generic: self.generic.trim().to_string(),
            manufacturer: self.manufacturer.trim().to_string(),
            category: self.category,
            unit,
            stock: self.stock.max(0),
            mrp_cents: self.mrp_cents,
            cost_price_cents: self.cost_price_cents,
            tax_rate_bps: self.tax_rate_bps,
            batch: self.batch.trim().to_string(),
            expiry: self.expiry,
            drug_schedule: normalize_schedule(self.drug_schedule),
            hsn: self.hsn.trim().to_string(),
            created_at: now,
            updated_at: None,
        }
    }
}

/// Partial update of a medicine. `None` leaves a field untouched.
///
/// Identity and creation time are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub generic: Option<String>,
    pub manufacturer: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub stock: Option<i64>,
    pub mrp_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
    pub batch: Option<String>,
    pub expiry: Option<Option<ExpiryMonth>>,
    pub drug_schedule: Option<Option<String>>,
    pub hsn: Option<String>,
}

impl MedicinePatch {
    /// A patch that overwrites every editable field (the edit form).
    pub fn replace_with(draft: MedicineDraft) -> Self {
        MedicinePatch {
            name: Some(draft.name),
            generic: Some(draft.generic),
            manufacturer: Some(draft.manufacturer),
            category: Some(draft.category),
            unit: Some(draft.unit),
            stock: Some(draft.stock),
            mrp_cents: Some(draft.mrp_cents),
            cost_price_cents: Some(draft.cost_price_cents),
            tax_rate_bps: Some(draft.tax_rate_bps),
            batch: Some(draft.batch),
            expiry: Some(draft.expiry),
            drug_schedule: Some(draft.drug_schedule),
            hsn: Some(draft.hsn),
        }
    }

    /// A patch that only changes stock.
    pub fn stock(stock: i64) -> Self {
        MedicinePatch {
            stock: Some(stock),
            ..Default::default()
        }
    }

    /// Applies the patch, clamping stock and stamping `updated_at`.
    pub fn apply(self, medicine: &mut Medicine, now: DateTime<Utc>) {
        if let Some(v) = self.name {
            medicine.name = v.trim().to_string();
        }
        if let Some(v) = self.generic {
            medicine.generic = v.trim().to_string();
        }
        if let Some(v) = self.manufacturer {
            medicine.manufacturer = v.trim().to_string();
        }
        if let Some(v) = self.category {
            medicine.category = v;
        }
        if let Some(v) = self.unit {
            medicine.unit = if v.trim().is_empty() { default_unit() } else { v };
        }
        if let Some(v) = self.stock {
            medicine.stock = v.max(0);
        }
        if let Some(v) = self.mrp_cents {
            medicine.mrp_cents = v;
        }
        if let Some(v) = self.cost_price_cents {
            medicine.cost_price_cents = v;
        }
        if let Some(v) = self.tax_rate_bps {
            medicine.tax_rate_bps = v;
        }
        if let Some(v) = self.batch {
            medicine.batch = v.trim().to_string();
        }
        if let Some(v) = self.expiry {
            medicine.expiry = v;
        }
        if let Some(v) = self.drug_schedule {
            medicine.drug_schedule = normalize_schedule(v);
        }
        if let Some(v) = self.hsn {
            medicine.hsn = v.trim().to_string();
        }
        medicine.updated_at = Some(now);
    }
}

/// Blank schedule text means "not scheduled"; tags are upper-cased.
pub fn normalize_schedule(tag: Option<String>) -> Option<String> {
    tag.map(|t| t.trim().to_uppercase()).filter(|t| !t.is_empty())
}

// =============================================================================
// Bill
// =============================================================================

/// How a bill was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentMode {
    #[default]
    Cash,
    #[serde(rename = "UPI")]
    Upi,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 2] = [PaymentMode::Cash, PaymentMode::Upi];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash",
            PaymentMode::Upi => "UPI",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMode::Cash),
            "upi" => Ok(PaymentMode::Upi),
            _ => Err(ValidationError::NotAllowed {
                field: "payment_mode".to_string(),
                allowed: PaymentMode::ALL.iter().map(|m| m.to_string()).collect(),
            }),
        }
    }
}

/// One line of a bill: a snapshot of the medicine at sale time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    /// Medicine this line was sold from (not kept consistent afterwards).
    pub medicine_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(default)]
    pub tax_rate_bps: u32,
    /// quantity × unit price, before tax.
    pub line_total_cents: i64,
}

impl BillItem {
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }

    /// Tax on this line, rounded per line.
    pub fn tax(&self) -> Money {
        self.line_total().calculate_tax(TaxRate::from_bps(self.tax_rate_bps))
    }
}

/// A recorded sale. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,

    /// Display number, `BILL-0001`.
    pub bill_no: String,

    pub items: Vec<BillItem>,

    #[serde(default)]
    pub payment_mode: PaymentMode,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
    pub grand_total_cents: i64,

    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub doctor_name: String,

    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    pub fn tax(&self) -> Money {
        Money::from_cents(self.tax_cents)
    }

    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    pub fn grand_total(&self) -> Money {
        Money::from_cents(self.grand_total_cents)
    }

    /// Calendar day (UTC) the bill was created on.
    pub fn day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Total units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Shop-level settings. A singleton, overwritten wholesale on save.
///
/// Missing fields fall back to defaults, so older or partial documents load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub shop_name: String,
    pub address: String,
    pub phone: String,
    /// GSTIN printed on receipts.
    pub gst_number: String,
    /// Drug license number printed on receipts.
    pub license_no: String,
    pub currency: String,
    pub low_stock_threshold: i64,
}

/// Shop name used when the form leaves it blank.
pub const DEFAULT_SHOP_NAME: &str = "MediCare Pharmacy";

/// Currency symbol used throughout.
pub const DEFAULT_CURRENCY: &str = "₹";

impl Default for Settings {
    fn default() -> Self {
        Settings {
            shop_name: DEFAULT_SHOP_NAME.to_string(),
            address: "123 Health Street, City".to_string(),
            phone: "9876543210".to_string(),
            gst_number: "GSTIN123456789".to_string(),
            license_no: "DL-12345".to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl Settings {
    /// Threshold actually used for stock status; non-positive values fall back.
    pub fn threshold(&self) -> i64 {
        if self.low_stock_threshold > 0 {
            self.low_stock_threshold
        } else {
            DEFAULT_LOW_STOCK_THRESHOLD
        }
    }

    /// What the settings form stores: blank shop name and a non-positive
    /// threshold fall back to their defaults, text fields are trimmed.
    pub fn normalized(self) -> Self {
        let shop_name = self.shop_name.trim();
        Settings {
            shop_name: if shop_name.is_empty() {
                DEFAULT_SHOP_NAME.to_string()
            } else {
                shop_name.to_string()
            },
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
            gst_number: self.gst_number.trim().to_string(),
            license_no: self.license_no.trim().to_string(),
            currency: if self.currency.trim().is_empty() {
                DEFAULT_CURRENCY.to_string()
            } else {
                self.currency.trim().to_string()
            },
            low_stock_threshold: self.threshold(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
