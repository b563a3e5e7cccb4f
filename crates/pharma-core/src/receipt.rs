//! # Receipt
//!
//! The printable bill, in two renderings:
//!
//! - [`render_text`]: fixed-width text for the terminal or a thermal printer
//! - [`render_html`]: a standalone page that prints itself when opened
//!
//! Both carry the same content. Shop and patient text is escaped in the HTML
//! rendering.

use std::fmt::Write;

use crate::format::{currency, escape_html, fit, format_datetime};
use crate::types::{Bill, Settings, TaxRate};

/// Width of the text receipt, in characters.
pub const RECEIPT_WIDTH: usize = 48;

const THANK_YOU: &str = "Thank you for your purchase!";
const GET_WELL: &str = "Get well soon";

fn centered(text: &str) -> String {
    let len = text.chars().count();
    if len >= RECEIPT_WIDTH {
        return text.to_string();
    }
    format!("{}{}", " ".repeat((RECEIPT_WIDTH - len) / 2), text)
}

fn total_row(label: &str, value: &str) -> String {
    let pad = RECEIPT_WIDTH.saturating_sub(label.chars().count() + value.chars().count());
    format!("{}{}{}", label, " ".repeat(pad.max(1)), value)
}

/// Renders the receipt as fixed-width text.
pub fn render_text(bill: &Bill, settings: &Settings) -> String {
    let sym = settings.currency.as_str();
    let dashes = "-".repeat(RECEIPT_WIDTH);
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", centered(&settings.shop_name));
    let _ = writeln!(out, "{}", centered(&settings.address));
    let _ = writeln!(
        out,
        "{}",
        centered(&format!("Ph: {} | GST: {}", settings.phone, settings.gst_number))
    );
    let _ = writeln!(out, "{}", centered(&format!("Drug Lic: {}", settings.license_no)));
    let _ = writeln!(out, "{}", "=".repeat(RECEIPT_WIDTH));
    let _ = writeln!(out, "Bill No: {}", bill.bill_no);
    let _ = writeln!(out, "Date:    {}", format_datetime(Some(bill.created_at)));
    if !bill.patient_name.is_empty() {
        let mut line = format!("Patient: {}", bill.patient_name);
        if !bill.doctor_name.is_empty() {
            let _ = write!(line, " | Dr: {}", bill.doctor_name);
        }
        let _ = writeln!(out, "{}", line);
    }

    let _ = writeln!(out, "{}", dashes);
    let _ = writeln!(
        out,
        "{} {:>4} {:>10} {:>4} {:>10}",
        fit("Medicine", 15),
        "Qty",
        "MRP",
        "GST",
        "Amt"
    );
    let _ = writeln!(out, "{}", dashes);
    for item in &bill.items {
        let _ = writeln!(
            out,
            "{} {:>4} {:>10} {:>4} {:>10}",
            fit(&item.name, 15),
            item.quantity,
            currency(crate::Money::from_cents(item.unit_price_cents), sym),
            format!("{}%", TaxRate::from_bps(item.tax_rate_bps).percent_label()),
            currency(item.line_total(), sym),
        );
    }
    let _ = writeln!(out, "{}", dashes);

    let _ = writeln!(out, "{}", total_row("Subtotal", &currency(bill.subtotal(), sym)));
    if bill.tax().is_positive() {
        let _ = writeln!(out, "{}", total_row("GST", &currency(bill.tax(), sym)));
    }
    if bill.discount().is_positive() {
        let _ = writeln!(
            out,
            "{}",
            total_row("Discount", &format!("- {}", currency(bill.discount(), sym)))
        );
    }
    let _ = writeln!(out, "{}", total_row("TOTAL", &currency(bill.grand_total(), sym)));
    let _ = writeln!(out, "Payment: {}", bill.payment_mode);
    let _ = writeln!(out, "{}", "=".repeat(RECEIPT_WIDTH));
    let _ = writeln!(out, "{}", centered(THANK_YOU));
    let _ = writeln!(out, "{}", centered(GET_WELL));
    out
}

const RECEIPT_CSS: &str = "\
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Courier New', monospace; font-size: 12px; padding: 10px; color: #000; }
.header { text-align: center; border-bottom: 2px dashed #000; padding-bottom: 8px; margin-bottom: 8px; }
.header h2 { font-size: 16px; }
.bill-info { display: flex; justify-content: space-between; margin-bottom: 8px; font-size: 11px; }
table { width: 100%; border-collapse: collapse; margin: 8px 0; }
th { border-top: 1px dashed #000; border-bottom: 1px dashed #000; padding: 4px 2px; font-size: 11px; }
td { padding: 3px 2px; font-size: 11px; }
.num { text-align: right; }
.totals { border-top: 1px dashed #000; }
.grand-total td { font-weight: bold; font-size: 13px; border-top: 1px dashed #000; }
.footer { text-align: center; border-top: 2px dashed #000; margin-top: 8px; padding-top: 8px; font-size: 10px; }";

/// Renders the receipt as a self-printing HTML page.
pub fn render_html(bill: &Bill, settings: &Settings) -> String {
    let sym = escape_html(&settings.currency);
    let money = |m: crate::Money| format!("{}{}", sym, m);
    let mut rows = String::new();
    for item in &bill.items {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td style=\"text-align:center\">{}</td><td class=\"num\">{}</td>\
             <td class=\"num\">{}%</td><td class=\"num\">{}</td></tr>\n",
            escape_html(&item.name),
            item.quantity,
            money(crate::Money::from_cents(item.unit_price_cents)),
            TaxRate::from_bps(item.tax_rate_bps).percent_label(),
            money(item.line_total()),
        );
    }

    let mut party = String::new();
    if !bill.patient_name.is_empty() {
        let _ = write!(party, "<div><b>Patient:</b> {}", escape_html(&bill.patient_name));
        if !bill.doctor_name.is_empty() {
            let _ = write!(party, " | <b>Dr:</b> {}", escape_html(&bill.doctor_name));
        }
        party.push_str("</div>\n");
    }

    let mut totals = format!("<tr><td>Subtotal</td><td class=\"num\">{}</td></tr>\n", money(bill.subtotal()));
    if bill.tax().is_positive() {
        let _ = writeln!(totals, "<tr><td>GST</td><td class=\"num\">{}</td></tr>", money(bill.tax()));
    }
    if bill.discount().is_positive() {
        let _ = writeln!(
            totals,
            "<tr><td>Discount</td><td class=\"num\">- {}</td></tr>",
            money(bill.discount())
        );
    }
    let _ = writeln!(
        totals,
        "<tr class=\"grand-total\"><td>TOTAL</td><td class=\"num\">{}</td></tr>",
        money(bill.grand_total())
    );

    format!(
        "<!DOCTYPE html>
<html>
<head>
<meta charset=\"utf-8\">
<title>Bill - {bill_no}</title>
<style>
{css}
</style>
</head>
<body>
<div class=\"header\">
<h2>{shop}</h2>
<p>{address}</p>
<p>Ph: {phone} | GST: {gst}</p>
<p>Drug Lic: {license}</p>
</div>
<div class=\"bill-info\"><span><b>Bill No:</b> {bill_no}</span><span><b>Date:</b> {date}</span></div>
{party}<table>
<thead><tr><th style=\"text-align:left\">Medicine</th><th>Qty</th><th class=\"num\">MRP</th><th class=\"num\">GST</th><th class=\"num\">Amt</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
<table class=\"totals\">
{totals}</table>
<div><b>Payment:</b> {payment}</div>
<div class=\"footer\"><p>{thanks}</p><p>{well}</p></div>
<script>window.onload = () => {{ window.print(); }}</script>
</body>
</html>
",
        bill_no = escape_html(&bill.bill_no),
        css = RECEIPT_CSS,
        shop = escape_html(&settings.shop_name),
        address = escape_html(&settings.address),
        phone = escape_html(&settings.phone),
        gst = escape_html(&settings.gst_number),
        license = escape_html(&settings.license_no),
        date = format_datetime(Some(bill.created_at)),
        party = party,
        rows = rows,
        totals = totals,
        payment = bill.payment_mode,
        thanks = THANK_YOU,
        well = GET_WELL,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::{bill_item, BillDraft};
    use crate::money::Money;
    use crate::types::{MedicineDraft, PaymentMode};
    use chrono::{TimeZone, Utc};

    fn bill(discount_cents: i64, patient: &str) -> Bill {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let med = MedicineDraft {
            name: "Amoxicillin 250mg".into(),
            mrp_cents: 4500,
            tax_rate_bps: 1200,
            stock: 80,
            ..Default::default()
        }
        .into_medicine("m".into(), now);
        BillDraft {
            items: vec![bill_item(&med, 3)],
            payment_mode: PaymentMode::Upi,
            discount: Money::from_cents(discount_cents),
            patient_name: patient.into(),
            doctor_name: "Dr. Rao".into(),
        }
        .into_bill("id".into(), "BILL-0007".into(), now)
        .unwrap()
    }

    #[test]
    fn test_text_receipt_content() {
        let text = render_text(&bill(500, "Asha"), &Settings::default());

        assert!(text.contains("MediCare Pharmacy"));
        assert!(text.contains("Ph: 9876543210 | GST: GSTIN123456789"));
        assert!(text.contains("Drug Lic: DL-12345"));
        assert!(text.contains("Bill No: BILL-0007"));
        assert!(text.contains("16 Oct 2026 09:30 AM"));
        assert!(text.contains("Patient: Asha | Dr: Dr. Rao"));
        assert!(text.contains("₹135.00"));
        assert!(text.contains("12%"));
        assert!(text.contains("- ₹5.00"));
        assert!(text.contains("₹146.20"));
        assert!(text.contains("Payment: UPI"));
        assert!(text.contains("Thank you for your purchase!"));
    }

    #[test]
    fn test_text_receipt_omits_empty_rows() {
        let text = render_text(&bill(0, ""), &Settings::default());
        assert!(!text.contains("Discount"));
        assert!(!text.contains("Patient:"));
    }

    #[test]
    fn test_html_receipt_escapes_user_text() {
        let settings = Settings {
            shop_name: "A&B <Chemists>".into(),
            ..Settings::default()
        };
        let html = render_html(&bill(0, "<script>x</script>"), &settings);

        assert!(html.contains("<h2>A&amp;B &lt;Chemists&gt;</h2>"));
        assert!(html.contains("&lt;script&gt;x&lt;/script&gt;"));
        assert!(!html.contains("<script>x</script>"));
        assert!(html.contains("<td>GST</td>"));
        assert!(!html.contains("Discount"));
        assert!(html.contains("window.print()"));
    }
}
