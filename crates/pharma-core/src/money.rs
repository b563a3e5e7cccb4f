//! # Money Module
//!
//! Provides the `Money` type for handling rupee amounts safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    2 × 12.50 × 0.05 + 3 × 45.00 × 0.12 in f64 = 17.450000000000003      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer paise                                            │
//! │    2500 × 500bps → 125     13500 × 1200bps → 1620     tax = 1745        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts coming from the spreadsheet endpoint arrive as decimal text
//! (`"12.50"`, `"45"`). [`Money::parse_major`] converts them without ever
//! going through a float.
//!
//! ## Usage
//! ```rust
//! use pharma_core::money::Money;
//!
//! let price = Money::from_cents(1250); // ₹12.50
//! let line = price * 2;                // ₹25.00
//! assert_eq!(line.cents(), 2500);
//! assert_eq!(Money::parse_major("45.00"), Some(Money::from_cents(4500)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: discounts can push a total negative before validation
/// - **Single field tuple struct**: serializes as a bare integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal amount written in major units.
    ///
    /// Accepts an optional sign, a whole part and an optional fraction.
    /// Digits past the second decimal place round half up.
    /// Returns `None` for anything that is not a plain decimal number.
    ///
    /// ```rust
    /// use pharma_core::money::Money;
    ///
    /// assert_eq!(Money::parse_major("12.5"), Some(Money::from_cents(1250)));
    /// assert_eq!(Money::parse_major(" 8 "), Some(Money::from_cents(800)));
    /// assert_eq!(Money::parse_major("0.125"), Some(Money::from_cents(13)));
    /// assert_eq!(Money::parse_major("-5.50"), Some(Money::from_cents(-550)));
    /// assert_eq!(Money::parse_major("12,50"), None);
    /// assert_eq!(Money::parse_major(""), None);
    /// ```
    pub fn parse_major(input: &str) -> Option<Money> {
        let text = input.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if whole.is_empty() && fraction.is_empty() {
            return None;
        }
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(whole) || !all_digits(fraction) {
            return None;
        }

        let whole_value: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut digits = fraction.bytes().map(|b| i64::from(b - b'0'));
        let tenths = digits.next().unwrap_or(0);
        let hundredths = digits.next().unwrap_or(0);
        let round_up = digits.next().is_some_and(|d| d >= 5);

        let mut cents = whole_value
            .checked_mul(100)?
            .checked_add(tenths * 10 + hundredths)?;
        if round_up {
            cents = cents.checked_add(1)?;
        }
        Some(Money(if negative { -cents } else { cents }))
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the rupee portion (truncated toward zero).
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Calculates tax on this amount, rounding half up to the nearest paisa.
    ///
    /// Integer math: `(amount * bps + 5000) / 10000`.
    ///
    /// ```rust
    /// use pharma_core::money::Money;
    /// use pharma_core::types::TaxRate;
    ///
    /// let line = Money::from_cents(13500); // 3 × ₹45.00
    /// assert_eq!(line.calculate_tax(TaxRate::from_percent(12)).cents(), 1620);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 keeps large catalogs from overflowing
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies money by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Like [`Money::multiply_quantity`], for quantities read from outside
    /// the cart (remote bills), where the product can leave `i64`.
    ///
    /// ```rust
    /// use pharma_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1250).checked_multiply_quantity(3), Some(Money::from_cents(3750)));
    /// assert_eq!(Money::from_cents(100_000).checked_multiply_quantity(100_000_000_000_000_000), None);
    /// ```
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Renders the amount as a plain decimal in major units: `"12.50"`.
    ///
    /// This is the form written to the spreadsheet endpoint.
    pub fn to_major_string(&self) -> String {
        self.to_string()
    }

    /// Share of `self` in `total`, in tenths of a percent (1000 = 100.0%).
    ///
    /// Returns 0 when `total` is not positive.
    pub fn share_permille(&self, total: Money) -> i64 {
        if total.0 <= 0 {
            return 0;
        }
        ((self.0 as i128 * 1000 + total.0 as i128 / 2) / total.0 as i128) as i64
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal, no currency symbol. Use [`crate::format::currency`] for display.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
