//! # Billing Page
//!
//! Builds a bill in the session cart and records it.
//!
//! ```text
//! search "para" ──► numbered hits (kept in the session)
//!        │
//!        ▼
//! add 1 ──► cart line ──► inc / dec / qty / remove
//!        │
//!        ▼
//! payment upi, discount 5, patient ..., doctor ...
//!        │
//!        ▼
//! submit ──► DataStore::create_bill ──► receipt ──► bill reset
//! ```
//!
//! Out of the shell the cart does not survive between invocations, so
//! `submit --item REF[:QTY]` fills it in the same call.

use std::fmt;
use std::path::Path;

use tracing::info;

use pharma_core::catalog::{self, ALTERNATIVES_LIMIT, SEARCH_RESULT_LIMIT};
use pharma_core::cart::QuantityChange;
use pharma_core::format::{currency, fit};
use pharma_core::receipt;
use pharma_core::validation::validate_quantity;
use pharma_core::{CoreError, Medicine, Settings};

use super::{find_medicine, Counter};
use crate::cli::{BillingCommand, SubmitArgs};
use crate::error::{CliError, CliResult, ErrorCode};
use crate::notify::Notice;
use crate::state::BillInProgress;

pub async fn run(counter: &mut Counter, action: Option<BillingCommand>) -> CliResult<String> {
    let action = action.unwrap_or(BillingCommand::Show);
    let bill = &mut counter.session.bill;

    let notice = match action {
        BillingCommand::Show => None,

        BillingCommand::Search { query } => {
            let medicines = counter.store.medicines_cached().await;
            return Ok(search(bill, &medicines, &query.join(" "), &counter.store.settings().await));
        }

        BillingCommand::Add { medicine } => {
            let medicines = counter.store.medicines_cached().await;
            let target = resolve_pick(bill, &medicines, &medicine)?;
            let qty = bill.cart.add_medicine(target)?;
            Some(Notice::success(format!("Added {} (qty {})", target.name, qty)))
        }

        BillingCommand::Inc { line } => {
            let index = line_index(bill, line)?;
            bill.cart.change_quantity(index, 1)?;
            None
        }

        BillingCommand::Dec { line } => {
            let index = line_index(bill, line)?;
            match bill.cart.change_quantity(index, -1)? {
                QuantityChange::Removed => Some(Notice::info(format!("Line {} removed", line))),
                _ => None,
            }
        }

        BillingCommand::Qty { line, quantity } => {
            let index = line_index(bill, line)?;
            match bill.cart.set_quantity(index, quantity)? {
                QuantityChange::Clamped(qty) => Some(Notice::info(format!("Only {} in stock", qty))),
                _ => None,
            }
        }

        BillingCommand::Remove { line } => {
            let index = line_index(bill, line)?;
            let removed = bill.cart.remove(index)?;
            Some(Notice::info(format!("Removed {}", removed.name)))
        }

        BillingCommand::Clear => {
            bill.reset();
            Some(Notice::info("Bill cleared"))
        }

        BillingCommand::Payment { mode } => {
            bill.payment_mode = mode;
            None
        }

        BillingCommand::Discount { amount } => {
            bill.discount = amount;
            None
        }

        BillingCommand::Patient { name } => {
            bill.patient_name = name.join(" ").trim().to_string();
            None
        }

        BillingCommand::Doctor { name } => {
            bill.doctor_name = name.join(" ").trim().to_string();
            None
        }

        BillingCommand::Submit(args) => return submit(counter, args).await,
    };

    let settings = counter.store.settings().await;
    let view = BillView {
        bill: &counter.session.bill,
        symbol: &settings.currency,
    };
    Ok(match notice {
        Some(notice) => format!("{}\n\n{}", notice, view),
        None => view.to_string(),
    })
}

/// Runs the search box: numbered hits, with in-stock alternatives under
/// anything that is out of stock.
fn search(bill: &mut BillInProgress, medicines: &[Medicine], query: &str, settings: &Settings) -> String {
    let hits: Vec<&Medicine> = catalog::search(medicines, query)
        .into_iter()
        .take(SEARCH_RESULT_LIMIT)
        .collect();
    bill.last_search = hits.iter().map(|m| m.id.clone()).collect();

    if hits.is_empty() {
        return Notice::info(format!("No medicines match '{}'", query.trim())).to_string();
    }

    let mut out = String::new();
    for (n, m) in hits.iter().enumerate() {
        let stock = if m.stock > 0 {
            format!("{} in stock", m.stock)
        } else {
            "out of stock".to_string()
        };
        out.push_str(&format!(
            "{:>2}. {} {:>10}  {}  {}\n",
            n + 1,
            fit(&m.name, 26),
            currency(m.mrp(), &settings.currency),
            fit(&m.manufacturer, 14),
            stock
        ));
        if m.stock <= 0 {
            for alt in catalog::alternatives(medicines, &m.id)
                .into_iter()
                .take(ALTERNATIVES_LIMIT)
            {
                out.push_str(&format!(
                    "      try {} ({}, {} in stock)\n",
                    alt.name, alt.manufacturer, alt.stock
                ));
            }
        }
    }
    out.push_str("\nAdd with: add <number>");
    out
}

/// `add 2` picks the second search hit; anything else is a medicine
/// reference.
fn resolve_pick<'a>(bill: &BillInProgress, medicines: &'a [Medicine], pick: &str) -> CliResult<&'a Medicine> {
    if let Ok(n) = pick.trim().parse::<usize>() {
        if let Some(id) = n.checked_sub(1).and_then(|i| bill.last_search.get(i)) {
            return find_medicine(medicines, id);
        }
        if !bill.last_search.is_empty() {
            return Err(CliError::validation(format!("No search result {}", n)));
        }
    }
    find_medicine(medicines, pick)
}

/// Cart lines are numbered from 1 on screen.
fn line_index(bill: &BillInProgress, line: usize) -> CliResult<usize> {
    if line == 0 || line > bill.cart.item_count() {
        return Err(CliError::validation(format!("No cart line {}", line)));
    }
    Ok(line - 1)
}

/// Splits `REF[:QTY]`. A suffix that is not a number stays part of the
/// reference.
fn parse_item(item: &str) -> CliResult<(&str, i64)> {
    if let Some((reference, qty)) = item.rsplit_once(':') {
        if let Ok(qty) = qty.trim().parse::<i64>() {
            validate_quantity(qty).map_err(|e| CliError::validation(e.to_string()))?;
            return Ok((reference, qty));
        }
    }
    Ok((item, 1))
}

async fn submit(counter: &mut Counter, args: SubmitArgs) -> CliResult<String> {
    // Work on a copy; the session bill only changes once the bill is recorded.
    let mut bill = counter.session.bill.clone();

    if !args.items.is_empty() {
        let medicines = counter.store.medicines_cached().await;
        for item in &args.items {
            let (reference, qty) = parse_item(item)?;
            let medicine = find_medicine(&medicines, reference)?;
            bill.cart.add_medicine(medicine)?;
            if qty > 1 {
                let index = bill
                    .cart
                    .lines()
                    .iter()
                    .position(|l| l.medicine_id == medicine.id)
                    .ok_or_else(|| CoreError::MedicineNotFound(medicine.id.clone()))?;
                bill.cart.change_quantity(index, qty - 1)?;
            }
        }
    }
    if let Some(mode) = args.payment {
        bill.payment_mode = mode;
    }

    let draft = bill.cart.checkout(
        bill.payment_mode,
        bill.discount,
        &bill.patient_name,
        &bill.doctor_name,
    )?;
    let recorded = counter.store.create_bill(draft).await?;
    counter.session.bill.reset();
    info!(bill_no = %recorded.bill_no, "Bill submitted from counter");

    let settings = counter.store.settings().await;
    let mut out = format!(
        "{}\n\n{}",
        Notice::success(format!(
            "Bill {} saved, {}",
            recorded.bill_no,
            currency(recorded.grand_total(), &settings.currency)
        )),
        receipt::render_text(&recorded, &settings)
    );
    if let Some(path) = args.html {
        write_html_receipt(&path, &receipt::render_html(&recorded, &settings))?;
        out.push_str(&format!("\n{}", Notice::info(format!("HTML receipt written to {}", path.display()))));
    }
    Ok(out)
}

pub(crate) fn write_html_receipt(path: &Path, html: &str) -> CliResult<()> {
    std::fs::write(path, html)
        .map_err(|e| CliError::new(ErrorCode::IoError, format!("{}: {}", path.display(), e)))
}

// =============================================================================
// View
// =============================================================================

struct BillView<'a> {
    bill: &'a BillInProgress,
    symbol: &'a str,
}

impl fmt::Display for BillView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bill = self.bill;
        let money = |m| currency(m, self.symbol);

        writeln!(f, "New Bill")?;
        if bill.cart.is_empty() {
            writeln!(f, "  Cart is empty. Search medicines to add.")?;
        }
        for (n, line) in bill.cart.lines().iter().enumerate() {
            let schedule = line
                .drug_schedule
                .as_deref()
                .map(|s| format!(" [{}]", s))
                .unwrap_or_default();
            writeln!(
                f,
                "  {:>2}. {} {:>4} x {:>10} = {:>11}",
                n + 1,
                fit(&format!("{}{}", line.name, schedule), 28),
                line.quantity,
                money(line.unit_price()),
                money(line.line_total())
            )?;
        }

        let totals = bill.cart.totals(bill.discount);
        writeln!(f)?;
        writeln!(f, "  Items     {} ({} units)", bill.cart.item_count(), bill.cart.total_quantity())?;
        writeln!(f, "  Subtotal  {:>12}", money(totals.subtotal))?;
        writeln!(f, "  GST       {:>12}", money(totals.tax))?;
        if !totals.discount.is_zero() {
            writeln!(f, "  Discount  {:>12}", money(totals.discount))?;
        }
        writeln!(f, "  Total     {:>12}", money(totals.grand_total))?;
        write!(f, "  Payment   {}", bill.payment_mode)?;
        if !bill.patient_name.is_empty() {
            write!(f, "\n  Patient   {}", bill.patient_name)?;
        }
        if !bill.doctor_name.is_empty() {
            write!(f, "\n  Doctor    {}", bill.doctor_name)?;
        }
        Ok(())
    }
}
