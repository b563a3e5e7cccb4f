//! Display helpers shared by the counter screens and the receipt.

use chrono::{DateTime, NaiveDate, Utc};

use crate::money::Money;

/// Placeholder shown for a missing date.
pub const MISSING: &str = "—";

/// `₹12.50`. Negative amounts keep the sign after the symbol: `₹-3.00`.
pub fn currency(amount: Money, symbol: &str) -> String {
    format!("{}{}", symbol, amount)
}

/// `16 Oct 2026`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

/// `16 Oct 2026 09:05 AM`, or the placeholder when there is no timestamp.
pub fn format_datetime(at: Option<DateTime<Utc>>) -> String {
    match at {
        Some(at) => at.format("%d %b %Y %I:%M %p").to_string(),
        None => MISSING.to_string(),
    }
}

/// `2026-10-16`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Escapes text for inclusion in HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Pads or truncates to exactly `width` characters (left-aligned).
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
        cut.push('…');
        cut
    } else {
        format!("{}{}", text, " ".repeat(width - count))
    }
}

/// A horizontal bar scaled against `max`, at most `width` cells wide.
///
/// Any non-zero value gets at least one cell so small days stay visible.
pub fn bar(value: Money, max: Money, width: usize) -> String {
    if max.cents() <= 0 || value.cents() <= 0 {
        return String::new();
    }
    let cells = (value.cents() as i128 * width as i128 / max.cents() as i128) as usize;
    "█".repeat(cells.clamp(1, width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_currency() {
        assert_eq!(currency(Money::from_cents(1250), "₹"), "₹12.50");
        assert_eq!(currency(Money::zero(), "Rs "), "Rs 0.00");
    }

    #[test]
    fn test_dates() {
        let at = Utc.with_ymd_and_hms(2026, 10, 6, 21, 5, 0).unwrap();
        assert_eq!(format_date(at.date_naive()), "06 Oct 2026");
        assert_eq!(format_datetime(Some(at)), "06 Oct 2026 09:05 PM");
        assert_eq!(format_datetime(None), "—");
        assert_eq!(iso_date(at.date_naive()), "2026-10-06");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("<b>Tom & \"Jerry\"</b>"),
            "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_fit_and_bar() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdefgh", 5), "abcd…");
        assert_eq!(bar(Money::from_cents(50), Money::from_cents(100), 10).chars().count(), 5);
        assert_eq!(bar(Money::from_cents(1), Money::from_cents(100000), 10).chars().count(), 1);
        assert!(bar(Money::zero(), Money::from_cents(100), 10).is_empty());
    }
}
