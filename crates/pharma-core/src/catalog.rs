//! # Catalog
//!
//! Medicine lookups used by the billing search box, the stock page and the
//! navigation badge.

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::types::{ExpiryMonth, ExpiryStatus, Medicine, StockStatus};

/// Most results the billing search dropdown shows.
pub const SEARCH_RESULT_LIMIT: usize = 8;

/// Most alternatives suggested for an out-of-stock result.
pub const ALTERNATIVES_LIMIT: usize = 3;

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Case-insensitive substring search over name, generic and manufacturer.
///
/// An empty (or all-whitespace) query returns nothing. That is different
/// from a query with no matches only in how the caller reports it.
pub fn search<'a>(medicines: &'a [Medicine], query: &str) -> Vec<&'a Medicine> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return Vec::new();
    }
    medicines
        .iter()
        .filter(|m| {
            contains_ci(&m.name, &q) || contains_ci(&m.generic, &q) || contains_ci(&m.manufacturer, &q)
        })
        .collect()
}

/// In-stock medicines with the same generic name as `medicine_id`.
pub fn alternatives<'a>(medicines: &'a [Medicine], medicine_id: &str) -> Vec<&'a Medicine> {
    let Some(target) = medicines.iter().find(|m| m.id == medicine_id) else {
        return Vec::new();
    };
    let generic = target.generic.trim().to_lowercase();
    if generic.is_empty() {
        return Vec::new();
    }
    medicines
        .iter()
        .filter(|m| m.id != target.id && m.stock > 0 && m.generic.trim().to_lowercase() == generic)
        .collect()
}

/// Count shown on the Stock navigation badge: everything at or below the
/// threshold, out-of-stock included.
pub fn attention_badge_count(medicines: &[Medicine], threshold: i64) -> usize {
    medicines.iter().filter(|m| m.stock <= threshold).count()
}

// =============================================================================
// Stock page filters
// =============================================================================

/// Status drop-down on the stock page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Above the threshold.
    Ok,
    Low,
    Out,
    /// Expiry within the warning window, already-expired included.
    Expiring,
}

/// Filter selections on the stock page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFilter {
    pub query: String,
    pub category: Option<String>,
    pub status: Option<StatusFilter>,
}

impl StockFilter {
    pub fn is_empty(&self) -> bool {
        self.query.trim().is_empty() && self.category.is_none() && self.status.is_none()
    }

    pub fn matches(&self, medicine: &Medicine, threshold: i64, current: ExpiryMonth) -> bool {
        let q = self.query.trim().to_lowercase();
        if !q.is_empty()
            && !(contains_ci(&medicine.name, &q)
                || contains_ci(&medicine.generic, &q)
                || contains_ci(&medicine.manufacturer, &q)
                || contains_ci(&medicine.batch, &q))
        {
            return false;
        }

        if let Some(category) = &self.category {
            if &medicine.category != category {
                return false;
            }
        }

        match self.status {
            None => true,
            Some(StatusFilter::Ok) => medicine.stock_status(threshold) == StockStatus::Ok,
            Some(StatusFilter::Low) => medicine.stock_status(threshold) == StockStatus::Low,
            Some(StatusFilter::Out) => medicine.stock_status(threshold) == StockStatus::Out,
            Some(StatusFilter::Expiring) => matches!(
                medicine.expiry_status(current),
                ExpiryStatus::Expired | ExpiryStatus::Expiring
            ),
        }
    }

    pub fn apply<'a>(
        &self,
        medicines: &'a [Medicine],
        threshold: i64,
        current: ExpiryMonth,
    ) -> Vec<&'a Medicine> {
        medicines
            .iter()
            .filter(|m| self.matches(m, threshold, current))
            .collect()
    }
}

/// Summary tiles above the stock table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockStats {
    pub total_medicines: usize,
    /// Σ stock × cost price.
    pub stock_value: Money,
    pub low: usize,
    pub out: usize,
}

impl StockStats {
    pub fn compute(medicines: &[Medicine], threshold: i64) -> Self {
        let mut stats = StockStats {
            total_medicines: medicines.len(),
            ..Default::default()
        };
        for m in medicines {
            stats.stock_value += m.stock_value();
            match m.stock_status(threshold) {
                StockStatus::Low => stats.low += 1,
                StockStatus::Out => stats.out += 1,
                StockStatus::Ok => {}
            }
        }
        stats
    }
}
