//! # Stock Page
//!
//! Catalog table with sticky filters, plus the add, edit, restock and
//! delete forms.
//!
//! ```text
//! stock list -s low -c Antacid      filters kept in SessionState,
//! stock list -p 2                   a filter change goes back to page 1
//! stock add --name .. --mrp ..      MedicineDraft ──► DataStore::add_medicine
//! stock edit <ref> --stock 40       MedicinePatch ──► DataStore::update_medicine
//! stock restock <ref> --qty 50 --expiry 2027-06
//! ```

use std::fmt;

use pharma_core::catalog::{StockFilter, StockStats};
use pharma_core::format::{currency, fit, format_datetime};
use pharma_core::page::{paginate, Page};
use pharma_core::types::{ExpiryMonth, ExpiryStatus, StockStatus, CATEGORIES};
use pharma_core::validation::{parse_expiry, validate_restock_quantity, validate_search_query};
use pharma_core::{Medicine, MedicineDraft, MedicinePatch, Settings, ValidationError};

use super::{find_medicine, short_id, today, Counter};
use crate::cli::{MedicineFields, RestockArgs, StockCommand, StockListArgs};
use crate::error::{CliError, CliResult};
use crate::notify::Notice;

/// Category given to medicines added without one.
const FALLBACK_CATEGORY: &str = "Other";

pub async fn run(counter: &mut Counter, action: Option<StockCommand>) -> CliResult<String> {
    match action.unwrap_or_else(|| StockCommand::List(StockListArgs::default())) {
        StockCommand::List(args) => list(counter, args).await,

        StockCommand::Show { medicine } => {
            let medicines = counter.store.medicines_cached().await;
            let settings = counter.store.settings().await;
            let medicine = find_medicine(&medicines, &medicine)?;
            Ok(MedicineView {
                medicine,
                settings: &settings,
            }
            .to_string())
        }

        StockCommand::Add(fields) => {
            let draft = draft_from(fields)?;
            let added = counter.store.add_medicine(draft).await?;
            Ok(Notice::success(format!(
                "Added {} ({})",
                added.name,
                short_id(&added.id)
            ))
            .to_string())
        }

        StockCommand::Edit { medicine, fields } => {
            let medicines = counter.store.medicines_cached().await;
            let target = find_medicine(&medicines, &medicine)?;
            let patch = patch_from(fields);
            if patch == MedicinePatch::default() {
                return Err(CliError::validation("Nothing to change"));
            }
            let updated = counter.store.update_medicine(&target.id, patch).await?;
            Ok(Notice::success(format!("Updated {}", updated.name)).to_string())
        }

        StockCommand::Restock(args) => restock(counter, args).await,

        StockCommand::Delete { medicine } => {
            let medicines = counter.store.medicines_cached().await;
            let target = find_medicine(&medicines, &medicine)?;
            counter.store.delete_medicine(&target.id).await?;
            Ok(Notice::info(format!("Deleted {}", target.name)).to_string())
        }
    }
}

async fn list(counter: &mut Counter, args: StockListArgs) -> CliResult<String> {
    let session = &mut counter.session;
    if args.reset {
        session.stock_filter = StockFilter::default();
        session.stock_page = 1;
    }

    let mut changed = false;
    if let Some(query) = args.query {
        session.stock_filter.query = validate_search_query(&query).map_err(validation)?;
        changed = true;
    }
    if let Some(category) = args.category {
        session.stock_filter.category = canonical_category(&category);
        changed = true;
    }
    if let Some(status) = args.status {
        session.stock_filter.status = Some(status.into());
        changed = true;
    }
    if changed {
        session.stock_page = 1;
    }
    if let Some(page) = args.page {
        session.stock_page = page.max(1);
    }

    let medicines = counter.store.medicines_cached().await;
    let settings = counter.store.settings().await;
    let threshold = settings.threshold();
    let current = ExpiryMonth::of(today());

    let matching: Vec<Medicine> = session
        .stock_filter
        .apply(&medicines, threshold, current)
        .into_iter()
        .cloned()
        .collect();
    let page = paginate(&matching, session.stock_page, counter.config.app.stock_page_size);
    session.stock_page = page.page;

    Ok(StockTable {
        stats: StockStats::compute(&medicines, threshold),
        filter: &session.stock_filter,
        page: &page,
        settings: &settings,
        current,
    }
    .to_string())
}

async fn restock(counter: &mut Counter, args: RestockArgs) -> CliResult<String> {
    validate_restock_quantity(args.qty).map_err(validation)?;
    let expiry = parse_expiry(&args.expiry).map_err(validation)?;

    let medicines = counter.store.medicines_cached().await;
    let target = find_medicine(&medicines, &args.medicine)?;

    let patch = MedicinePatch {
        stock: Some(target.stock.max(0) + args.qty),
        expiry: Some(Some(expiry)),
        batch: args.batch.filter(|b| !b.trim().is_empty()),
        cost_price_cents: args.cost.map(|c| c.cents()),
        ..Default::default()
    };
    let updated = counter.store.update_medicine(&target.id, patch).await?;
    Ok(Notice::success(format!(
        "{} restocked: {} → {} {}",
        updated.name, target.stock, updated.stock, updated.unit
    ))
    .to_string())
}

fn validation(err: ValidationError) -> CliError {
    CliError::validation(err.to_string())
}

/// Matches a known category regardless of case; unknown names pass
/// through trimmed. Blank clears the filter.
fn canonical_category(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    Some(
        CATEGORIES
            .iter()
            .find(|c| c.eq_ignore_ascii_case(input))
            .map(|c| c.to_string())
            .unwrap_or_else(|| input.to_string()),
    )
}

fn draft_from(fields: MedicineFields) -> CliResult<MedicineDraft> {
    let name = fields.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(validation(ValidationError::Required {
            field: "name".to_string(),
        }));
    }
    let mrp = fields.mrp.ok_or_else(|| {
        validation(ValidationError::Required {
            field: "mrp".to_string(),
        })
    })?;

    Ok(MedicineDraft {
        name,
        generic: fields.generic.unwrap_or_default(),
        manufacturer: fields.manufacturer.unwrap_or_default(),
        category: fields
            .category
            .as_deref()
            .and_then(canonical_category)
            .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
        unit: fields.unit.unwrap_or_default(),
        stock: fields.stock.unwrap_or(0),
        mrp_cents: mrp.cents(),
        cost_price_cents: fields.cost.map(|c| c.cents()).unwrap_or(0),
        tax_rate_bps: fields.gst.unwrap_or_default().bps(),
        batch: fields.batch.unwrap_or_default(),
        expiry: fields.expiry,
        drug_schedule: fields.schedule,
        hsn: fields.hsn.unwrap_or_default(),
    })
}

fn patch_from(fields: MedicineFields) -> MedicinePatch {
    MedicinePatch {
        name: fields.name,
        generic: fields.generic,
        manufacturer: fields.manufacturer,
        category: fields.category.as_deref().and_then(canonical_category),
        unit: fields.unit,
        stock: fields.stock,
        mrp_cents: fields.mrp.map(|m| m.cents()),
        cost_price_cents: fields.cost.map(|c| c.cents()),
        tax_rate_bps: fields.gst.map(|g| g.bps()),
        batch: fields.batch,
        expiry: fields.expiry.map(Some),
        drug_schedule: fields.schedule.map(Some),
        hsn: fields.hsn,
    }
}

fn status_label(medicine: &Medicine, threshold: i64, current: ExpiryMonth) -> &'static str {
    match (medicine.expiry_status(current), medicine.stock_status(threshold)) {
        (ExpiryStatus::Expired, _) => "Expired",
        (_, StockStatus::Out) => "Out of stock",
        (_, StockStatus::Low) => "Low",
        (ExpiryStatus::Expiring, _) => "Expiring",
        _ => "OK",
    }
}

// =============================================================================
// Views
// =============================================================================

struct StockTable<'a> {
    stats: StockStats,
    filter: &'a StockFilter,
    page: &'a Page<Medicine>,
    settings: &'a Settings,
    current: ExpiryMonth,
}

impl fmt::Display for StockTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = &self.settings.currency;
        let threshold = self.settings.threshold();

        writeln!(
            f,
            "Stock   {} medicines   value {}   {} low   {} out",
            self.stats.total_medicines,
            currency(self.stats.stock_value, symbol),
            self.stats.low,
            self.stats.out
        )?;
        if !self.filter.is_empty() {
            let mut parts = Vec::new();
            if !self.filter.query.is_empty() {
                parts.push(format!("query '{}'", self.filter.query));
            }
            if let Some(category) = &self.filter.category {
                parts.push(format!("category {}", category));
            }
            if let Some(status) = self.filter.status {
                parts.push(format!("status {:?}", status).to_lowercase());
            }
            writeln!(f, "Filters: {}", parts.join(", "))?;
        }
        writeln!(f)?;

        if self.page.items.is_empty() {
            writeln!(f, "  No medicines found")?;
        } else {
            writeln!(
                f,
                "  {:<8}  {:<26} {:<14} {:>6} {:>10}  {:<7}  Status",
                "Id", "Name", "Category", "Stock", "MRP", "Expiry"
            )?;
        }
        for m in &self.page.items {
            writeln!(
                f,
                "  {:<8}  {} {} {:>6} {:>10}  {:<7}  {}",
                short_id(&m.id),
                fit(&m.name, 26),
                fit(&m.category, 14),
                m.stock,
                currency(m.mrp(), symbol),
                m.expiry.map(|e| e.to_string()).unwrap_or_else(|| "-".into()),
                status_label(m, threshold, self.current)
            )?;
        }
        write!(
            f,
            "\nPage {} of {} ({} medicines)",
            self.page.page, self.page.total_pages, self.page.total_items
        )
    }
}

struct MedicineView<'a> {
    medicine: &'a Medicine,
    settings: &'a Settings,
}

impl fmt::Display for MedicineView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.medicine;
        let symbol = &self.settings.currency;
        let current = ExpiryMonth::of(today());
        let blank = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };

        writeln!(f, "{}", m.name)?;
        writeln!(f, "  Id            {}", m.id)?;
        writeln!(f, "  Generic       {}", blank(&m.generic))?;
        writeln!(f, "  Manufacturer  {}", blank(&m.manufacturer))?;
        writeln!(f, "  Category      {}", blank(&m.category))?;
        writeln!(f, "  Stock         {} {}", m.stock, m.unit)?;
        writeln!(f, "  MRP           {}", currency(m.mrp(), symbol))?;
        writeln!(f, "  Cost price    {}", currency(m.cost_price(), symbol))?;
        writeln!(f, "  GST           {}", m.tax_rate().percent_label())?;
        writeln!(f, "  Batch         {}", blank(&m.batch))?;
        writeln!(
            f,
            "  Expiry        {}",
            m.expiry.map(|e| e.to_string()).unwrap_or_else(|| "-".into())
        )?;
        if let Some(schedule) = &m.drug_schedule {
            writeln!(f, "  Schedule      {} (prescription)", schedule)?;
        }
        writeln!(f, "  HSN           {}", blank(&m.hsn))?;
        writeln!(
            f,
            "  Status        {}",
            status_label(m, self.settings.threshold(), current)
        )?;
        writeln!(f, "  Added         {}", format_datetime(Some(m.created_at)))?;
        write!(f, "  Updated       {}", format_datetime(m.updated_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::StatusArg;
    use crate::commands::testing::seeded_counter;
    use pharma_core::types::TaxRate;
    use pharma_core::Money;

    fn list_args() -> StockListArgs {
        StockListArgs::default()
    }

    #[tokio::test]
    async fn test_list_pages_and_filters() {
        let mut counter = seeded_counter().await;

        let out = run(&mut counter, None).await.unwrap();
        assert!(out.contains("Stock   10 medicines"));
        assert!(out.contains("Page 1 of 1 (10 medicines)"));

        let out = run(
            &mut counter,
            Some(StockCommand::List(StockListArgs {
                status: Some(StatusArg::Low),
                ..list_args()
            })),
        )
        .await
        .unwrap();
        assert!(out.contains("Filters: status low"));
        assert!(out.contains("Pantoprazole 40mg"));
        assert!(out.contains("(3 medicines)"));

        // The filter sticks until reset
        let out = run(&mut counter, None).await.unwrap();
        assert!(out.contains("(3 medicines)"));

        let out = run(
            &mut counter,
            Some(StockCommand::List(StockListArgs {
                reset: true,
                category: Some("antacid".into()),
                ..list_args()
            })),
        )
        .await
        .unwrap();
        assert!(out.contains("Filters: category Antacid"));
        assert!(out.contains("(2 medicines)"));
    }

    #[tokio::test]
    async fn test_list_page_clamps_and_uses_config_size() {
        let mut counter = seeded_counter().await;
        counter.config.app.stock_page_size = 4;

        let out = run(
            &mut counter,
            Some(StockCommand::List(StockListArgs {
                page: Some(9),
                ..list_args()
            })),
        )
        .await
        .unwrap();
        assert!(out.contains("Page 3 of 3 (10 medicines)"));
        assert_eq!(counter.session.stock_page, 3);
    }

    #[tokio::test]
    async fn test_add_defaults_and_validation() {
        let mut counter = seeded_counter().await;

        let out = run(
            &mut counter,
            Some(StockCommand::Add(MedicineFields {
                name: Some("Dolo 650".into()),
                mrp: Some(Money::from_cents(3000)),
                gst: TaxRate::parse_percent("12"),
                ..Default::default()
            })),
        )
        .await
        .unwrap();
        assert!(out.starts_with("✓ Added Dolo 650"));

        let meds = counter.store.medicines_cached().await;
        let dolo = meds.iter().find(|m| m.name == "Dolo 650").unwrap();
        assert_eq!(dolo.category, "Other");
        assert_eq!(dolo.unit, "Strip");
        assert_eq!(dolo.tax_rate_bps, 1200);
        assert_eq!(dolo.stock, 0);

        let err = run(&mut counter, Some(StockCommand::Add(MedicineFields::default())))
            .await
            .unwrap_err();
        assert_eq!(err.message, "name is required");

        let err = run(
            &mut counter,
            Some(StockCommand::Add(MedicineFields {
                name: Some("No Price".into()),
                ..Default::default()
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "mrp is required");
    }

    #[tokio::test]
    async fn test_edit_only_touches_given_fields() {
        let mut counter = seeded_counter().await;
        run(
            &mut counter,
            Some(StockCommand::Edit {
                medicine: "Cetirizine 10mg".into(),
                fields: MedicineFields {
                    stock: Some(40),
                    schedule: Some("h".into()),
                    ..Default::default()
                },
            }),
        )
        .await
        .unwrap();

        let meds = counter.store.medicines_cached().await;
        let m = meds.iter().find(|m| m.name == "Cetirizine 10mg").unwrap();
        assert_eq!(m.stock, 40);
        assert_eq!(m.drug_schedule.as_deref(), Some("H"));
        assert_eq!(m.mrp_cents, 1800);
        assert!(m.updated_at.is_some());

        let err = run(
            &mut counter,
            Some(StockCommand::Edit {
                medicine: "Cetirizine 10mg".into(),
                fields: MedicineFields::default(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "Nothing to change");
    }

    #[tokio::test]
    async fn test_restock_adds_and_sets_expiry() {
        let mut counter = seeded_counter().await;
        let out = run(
            &mut counter,
            Some(StockCommand::Restock(RestockArgs {
                medicine: "Pantoprazole 40mg".into(),
                qty: 50,
                expiry: "2028-02".into(),
                batch: Some("B099".into()),
                cost: None,
            })),
        )
        .await
        .unwrap();
        assert!(out.contains("3 → 53"));

        let meds = counter.store.medicines_cached().await;
        let m = meds.iter().find(|m| m.name == "Pantoprazole 40mg").unwrap();
        assert_eq!(m.expiry.unwrap().to_string(), "2028-02");
        assert_eq!(m.batch, "B099");
        assert_eq!(m.cost_price_cents, 3500);

        let err = run(
            &mut counter,
            Some(StockCommand::Restock(RestockArgs {
                medicine: "Pantoprazole 40mg".into(),
                qty: 0,
                expiry: "2028-02".into(),
                batch: None,
                cost: None,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        let err = run(
            &mut counter,
            Some(StockCommand::Restock(RestockArgs {
                medicine: "Pantoprazole 40mg".into(),
                qty: 5,
                expiry: " ".into(),
                batch: None,
                cost: None,
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "expiry is required");
    }

    #[tokio::test]
    async fn test_show_and_delete() {
        let mut counter = seeded_counter().await;
        let out = run(
            &mut counter,
            Some(StockCommand::Show {
                medicine: "metformin 500mg".into(),
            }),
        )
        .await
        .unwrap();
        assert!(out.contains("Manufacturer  Dr. Reddy's"));
        assert!(out.contains("Status        Expired"));

        run(
            &mut counter,
            Some(StockCommand::Delete {
                medicine: "Metformin 500mg".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(counter.store.medicines_cached().await.len(), 9);

        let err = run(
            &mut counter,
            Some(StockCommand::Delete {
                medicine: "Metformin 500mg".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::NotFound);
    }
}
