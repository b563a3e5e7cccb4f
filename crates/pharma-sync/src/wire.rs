//! # Wire Records
//!
//! The spreadsheet endpoint speaks a loose dialect of the domain types:
//! camelCase keys, numbers that may arrive as strings, and a couple of bill
//! field names that changed over time. Everything remote passes through this
//! module exactly once.
//!
//! ```text
//!            remote JSON                          domain
//!   ┌──────────────────────────────┐      ┌──────────────────────┐
//!   │ "mrp": "12.50" | 12.5 | ""   │ ───► │ mrp_cents: 1250 | 0  │
//!   │ "gst": "12" | 12             │ ───► │ tax_rate_bps: 1200   │
//!   │ "taxAmt" | "gstAmount"       │ ───► │ tax_cents            │
//!   │ "discountAmt" | "discount"   │ ───► │ discount_cents       │
//!   │ "qty" | "quantity"           │ ───► │ quantity             │
//!   │ "items": [..] | "[..]" | 7   │ ───► │ items (7 → empty)    │
//!   └──────────────────────────────┘      └──────────────────────┘
//! ```
//!
//! A blank or missing number reads as zero. Text that is not a number makes
//! the whole record invalid, as does a missing id; invalid records are logged
//! and skipped, never half-imported.
//!
//! Outbound, amounts are written as major-unit strings (`"12.50"`) and tax
//! rates as percent numbers.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use pharma_core::types::{normalize_schedule, DEFAULT_UNIT};
use pharma_core::{Bill, BillItem, ExpiryMonth, Medicine, Money, PaymentMode, Settings};

/// Why a remote record was skipped.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record has no id")]
    MissingId,

    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed record: {0}")]
    Malformed(String),
}

// =============================================================================
// Lenient field codecs
// =============================================================================

pub(crate) mod lenient {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};
    use serde_json::Value;

    use pharma_core::{Money, TaxRate};

    /// Any JSON scalar a spreadsheet cell can turn into.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(i64),
        Float(f64),
        Text(String),
        Bool(bool),
    }

    fn blank(text: &str) -> bool {
        text.trim().is_empty()
    }

    fn money_of(value: Option<Scalar>) -> Result<Option<i64>, String> {
        match value {
            None => Ok(None),
            Some(Scalar::Int(n)) => n
                .checked_mul(100)
                .map(Some)
                .ok_or_else(|| format!("amount {} is out of range", n)),
            Some(Scalar::Float(f)) => Ok(Some((f * 100.0).round() as i64)),
            Some(Scalar::Text(t)) if blank(&t) => Ok(None),
            Some(Scalar::Text(t)) => Money::parse_major(&t)
                .map(|m| Some(m.cents()))
                .ok_or_else(|| format!("'{}' is not an amount", t)),
            Some(Scalar::Bool(_)) => Err("expected an amount, got a boolean".to_string()),
        }
    }

    fn int_of(value: Option<Scalar>) -> Result<Option<i64>, String> {
        match value {
            None => Ok(None),
            Some(Scalar::Int(n)) => Ok(Some(n)),
            Some(Scalar::Float(f)) => Ok(Some(f.round() as i64)),
            Some(Scalar::Text(t)) if blank(&t) => Ok(None),
            Some(Scalar::Text(t)) => {
                let t = t.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
                    .map(Some)
                    .ok_or_else(|| format!("'{}' is not a number", t))
            }
            Some(Scalar::Bool(_)) => Err("expected a number, got a boolean".to_string()),
        }
    }

    fn percent_of(value: Option<Scalar>) -> Result<u32, String> {
        let bps = match value {
            None => return Ok(0),
            Some(Scalar::Int(n)) => n.checked_mul(100),
            Some(Scalar::Float(f)) => Some((f * 100.0).round() as i64),
            Some(Scalar::Text(t)) if blank(&t) => return Ok(0),
            Some(Scalar::Text(t)) => {
                return TaxRate::parse_percent(&t)
                    .map(|r| r.bps())
                    .ok_or_else(|| format!("'{}' is not a tax rate", t))
            }
            Some(Scalar::Bool(_)) => None,
        };
        bps.and_then(|b| u32::try_from(b).ok())
            .ok_or_else(|| "tax rate out of range".to_string())
    }

    fn text_of(value: Option<Scalar>) -> Option<String> {
        value.map(|v| match v {
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(t) => t,
            Scalar::Bool(b) => b.to_string(),
        })
    }

    pub fn money<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Option::<Scalar>::deserialize(d)?;
        money_of(value)
            .map(Option::unwrap_or_default)
            .map_err(de::Error::custom)
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Option::<Scalar>::deserialize(d)?;
        int_of(value)
            .map(Option::unwrap_or_default)
            .map_err(de::Error::custom)
    }

    /// Like [`int`], but unusable input reads as absent instead of failing.
    pub fn opt_int_lossy<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let value = Option::<Scalar>::deserialize(d)?;
        Ok(int_of(value).ok().flatten())
    }

    pub fn percent<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let value = Option::<Scalar>::deserialize(d)?;
        percent_of(value).map_err(de::Error::custom)
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Option::<Scalar>::deserialize(d)?;
        Ok(text_of(value).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let value = Option::<Scalar>::deserialize(d)?;
        Ok(text_of(value))
    }

    /// Line items as an array, or as an array encoded in a string.
    pub fn items<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        let value = Value::deserialize(d)?;
        let list = match value {
            Value::Array(_) => value,
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(inner @ Value::Array(_)) => inner,
                _ => return Ok(Vec::new()),
            },
            _ => return Ok(Vec::new()),
        };
        serde_json::from_value(list).map_err(de::Error::custom)
    }

    pub fn money_out<S: Serializer>(cents: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&Money::from_cents(*cents).to_major_string())
    }

    pub fn percent_out<S: Serializer>(bps: &u32, s: S) -> Result<S::Ok, S::Error> {
        if bps % 100 == 0 {
            s.serialize_u32(bps / 100)
        } else {
            s.serialize_f64(f64::from(*bps) / 100.0)
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

fn require_id(id: String) -> Result<String, RecordError> {
    let id = id.trim().to_string();
    if id.is_empty() {
        Err(RecordError::MissingId)
    } else {
        Ok(id)
    }
}

/// The first non-zero of a field and its older alias.
fn either(current: i64, alias: i64) -> i64 {
    if current != 0 {
        current
    } else {
        alias
    }
}

// =============================================================================
// Medicine
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMedicine {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub generic: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub stock: i64,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub mrp: i64,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub cost_price: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub unit: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub batch: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub expiry: String,
    #[serde(
        default,
        deserialize_with = "lenient::percent",
        serialize_with = "lenient::percent_out"
    )]
    pub gst: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub drug_schedule: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub hsn: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<String>,
}

impl From<&Medicine> for WireMedicine {
    fn from(m: &Medicine) -> Self {
        WireMedicine {
            id: m.id.clone(),
            name: m.name.clone(),
            generic: m.generic.clone(),
            manufacturer: m.manufacturer.clone(),
            category: m.category.clone(),
            stock: m.stock,
            mrp: m.mrp_cents,
            cost_price: m.cost_price_cents,
            unit: m.unit.clone(),
            batch: m.batch.clone(),
            expiry: m.expiry.map(|e| e.to_string()).unwrap_or_default(),
            gst: m.tax_rate_bps,
            drug_schedule: m.drug_schedule.clone().unwrap_or_default(),
            hsn: m.hsn.clone(),
            created_at: Some(m.created_at.to_rfc3339()),
            updated_at: m.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

impl TryFrom<WireMedicine> for Medicine {
    type Error = RecordError;

    fn try_from(w: WireMedicine) -> Result<Self, Self::Error> {
        let id = require_id(w.id)?;

        let expiry = match w.expiry.trim() {
            "" => None,
            text => match text.parse::<ExpiryMonth>() {
                Ok(month) => Some(month),
                Err(e) => {
                    warn!(id = %id, error = %e, "Ignoring unreadable expiry");
                    None
                }
            },
        };

        let unit = if w.unit.trim().is_empty() {
            DEFAULT_UNIT.to_string()
        } else {
            w.unit
        };

        // Stock value and cart lines multiply price by quantity
        let stock = w.stock.max(0);
        let in_range = |cents: i64| Money::from_cents(cents).checked_multiply_quantity(stock).is_some();
        if !in_range(w.mrp) || !in_range(w.cost_price) {
            return Err(RecordError::InvalidField {
                field: "stock",
                reason: format!("{} units at this price are out of range", stock),
            });
        }

        Ok(Medicine {
            id,
            name: w.name,
            generic: w.generic,
            manufacturer: w.manufacturer,
            category: w.category,
            unit,
            stock,
            mrp_cents: w.mrp,
            cost_price_cents: w.cost_price,
            tax_rate_bps: w.gst,
            batch: w.batch,
            expiry,
            drug_schedule: normalize_schedule(Some(w.drug_schedule)),
            hsn: w.hsn,
            created_at: w
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_default(),
            updated_at: w.updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

// =============================================================================
// Bill
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBillItem {
    #[serde(default, deserialize_with = "lenient::text")]
    pub medicine_id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub qty: i64,
    #[serde(default, deserialize_with = "lenient::int", skip_serializing)]
    pub quantity: i64,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub mrp: i64,
    #[serde(default, deserialize_with = "lenient::money", skip_serializing)]
    pub price: i64,
    #[serde(
        default,
        deserialize_with = "lenient::percent",
        serialize_with = "lenient::percent_out"
    )]
    pub gst: u32,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub total: i64,
}

impl From<&BillItem> for WireBillItem {
    fn from(i: &BillItem) -> Self {
        WireBillItem {
            medicine_id: i.medicine_id.clone(),
            name: i.name.clone(),
            qty: i.quantity,
            quantity: 0,
            mrp: i.unit_price_cents,
            price: 0,
            gst: i.tax_rate_bps,
            total: i.line_total_cents,
        }
    }
}

impl TryFrom<WireBillItem> for BillItem {
    type Error = RecordError;

    fn try_from(w: WireBillItem) -> Result<Self, Self::Error> {
        let quantity = either(w.qty, w.quantity);
        let unit_price_cents = either(w.mrp, w.price);
        let line_total_cents = if w.total != 0 {
            w.total
        } else {
            Money::from_cents(unit_price_cents)
                .checked_multiply_quantity(quantity)
                .ok_or_else(|| RecordError::InvalidField {
                    field: "items",
                    reason: format!("{} x {} is out of range", quantity, unit_price_cents),
                })?
                .cents()
        };
        Ok(BillItem {
            medicine_id: w.medicine_id,
            name: w.name,
            quantity,
            unit_price_cents,
            tax_rate_bps: w.gst,
            line_total_cents,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireBill {
    #[serde(default, deserialize_with = "lenient::text")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub bill_no: String,
    #[serde(default, deserialize_with = "lenient::items")]
    pub items: Vec<WireBillItem>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub payment_mode: String,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub subtotal: i64,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub gst_amount: i64,
    #[serde(default, deserialize_with = "lenient::money", skip_serializing)]
    pub tax_amt: i64,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub discount: i64,
    #[serde(default, deserialize_with = "lenient::money", skip_serializing)]
    pub discount_amt: i64,
    #[serde(
        default,
        deserialize_with = "lenient::money",
        serialize_with = "lenient::money_out"
    )]
    pub grand_total: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub patient_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub doctor_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub created_at: String,
}

impl From<&Bill> for WireBill {
    fn from(b: &Bill) -> Self {
        WireBill {
            id: b.id.clone(),
            bill_no: b.bill_no.clone(),
            items: b.items.iter().map(WireBillItem::from).collect(),
            payment_mode: b.payment_mode.to_string(),
            subtotal: b.subtotal_cents,
            gst_amount: b.tax_cents,
            tax_amt: 0,
            discount: b.discount_cents,
            discount_amt: 0,
            grand_total: b.grand_total_cents,
            patient_name: b.patient_name.clone(),
            doctor_name: b.doctor_name.clone(),
            created_at: b.created_at.to_rfc3339(),
        }
    }
}

impl TryFrom<WireBill> for Bill {
    type Error = RecordError;

    fn try_from(w: WireBill) -> Result<Self, Self::Error> {
        let id = require_id(w.id)?;
        let created_at =
            parse_timestamp(&w.created_at).ok_or_else(|| RecordError::InvalidField {
                field: "createdAt",
                reason: format!("'{}' is not a timestamp", w.created_at),
            })?;
        let payment_mode = w.payment_mode.parse().unwrap_or_else(|_| {
            debug!(id = %id, mode = %w.payment_mode, "Unknown payment mode, reading as Cash");
            PaymentMode::Cash
        });

        let items = w
            .items
            .into_iter()
            .map(BillItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        // Report totals add these up; a bill whose lines cannot be summed is unusable
        if items
            .iter()
            .try_fold(0i64, |acc, i| acc.checked_add(i.line_total_cents))
            .is_none()
        {
            return Err(RecordError::InvalidField {
                field: "items",
                reason: "line totals are out of range".to_string(),
            });
        }

        Ok(Bill {
            id,
            bill_no: w.bill_no,
            items,
            payment_mode,
            subtotal_cents: w.subtotal,
            tax_cents: either(w.gst_amount, w.tax_amt),
            discount_cents: either(w.discount, w.discount_amt),
            grand_total_cents: w.grand_total,
            patient_name: w.patient_name,
            doctor_name: w.doctor_name,
            created_at,
        })
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Settings as the remote stores them. Every key is optional so a partial
/// remote record only overrides what it carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireSettings {
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub shop_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    /// GSTIN, not a rate.
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub gst: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_no: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_int_lossy",
        skip_serializing_if = "Option::is_none"
    )]
    pub low_stock_threshold: Option<i64>,
}

impl From<&Settings> for WireSettings {
    fn from(s: &Settings) -> Self {
        WireSettings {
            shop_name: Some(s.shop_name.clone()),
            address: Some(s.address.clone()),
            phone: Some(s.phone.clone()),
            gst: Some(s.gst_number.clone()),
            license_no: Some(s.license_no.clone()),
            currency: Some(s.currency.clone()),
            low_stock_threshold: Some(s.low_stock_threshold),
        }
    }
}

impl WireSettings {
    /// True when the remote record carried none of the known keys.
    pub fn is_empty(&self) -> bool {
        *self == WireSettings::default()
    }

    /// Overlays the remote keys onto the local record.
    ///
    /// A threshold that is missing, unreadable or not positive keeps the
    /// local value.
    pub fn merge_into(self, local: Settings) -> Settings {
        Settings {
            shop_name: self.shop_name.unwrap_or(local.shop_name),
            address: self.address.unwrap_or(local.address),
            phone: self.phone.unwrap_or(local.phone),
            gst_number: self.gst.unwrap_or(local.gst_number),
            license_no: self.license_no.unwrap_or(local.license_no),
            currency: self.currency.unwrap_or(local.currency),
            low_stock_threshold: self
                .low_stock_threshold
                .filter(|t| *t > 0)
                .unwrap_or(local.low_stock_threshold),
        }
    }
}

// =============================================================================
// Decoding collections
// =============================================================================

fn decode_list<W, T>(data: Value, kind: &'static str) -> Option<Vec<T>>
where
    W: DeserializeOwned,
    T: TryFrom<W, Error = RecordError>,
{
    let Value::Array(rows) = data else {
        warn!(kind, "Remote data is not a list, ignoring");
        return None;
    };

    let total = rows.len();
    let mut records = Vec::with_capacity(total);
    for (index, row) in rows.into_iter().enumerate() {
        let decoded = serde_json::from_value::<W>(row)
            .map_err(|e| RecordError::Malformed(e.to_string()))
            .and_then(T::try_from);
        match decoded {
            Ok(record) => records.push(record),
            Err(e) => warn!(kind, index, error = %e, "Skipping remote record"),
        }
    }

    debug!(kind, total, kept = records.len(), "Decoded remote records");
    Some(records)
}

/// Decodes a `getMedicines` payload. `None` when it is not a list.
pub fn decode_medicines(data: Value) -> Option<Vec<Medicine>> {
    decode_list::<WireMedicine, Medicine>(data, "medicine")
}

/// Decodes a `getBills` payload. `None` when it is not a list.
pub fn decode_bills(data: Value) -> Option<Vec<Bill>> {
    decode_list::<WireBill, Bill>(data, "bill")
}

/// Decodes a `getSettings` payload. `None` when it is not an object.
pub fn decode_settings(data: Value) -> Option<WireSettings> {
    if !data.is_object() {
        return None;
    }
    match serde_json::from_value(data) {
        Ok(settings) => Some(settings),
        Err(e) => {
            warn!(error = %e, "Remote settings are malformed, ignoring");
            None
        }
    }
}
