//! # Settings Page
//!
//! Shop details, the remote endpoint and every explicit sync and backup
//! action.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  show / save              shop fields, threshold, currency              │
//! │  endpoint [url]           set or clear, prefix checked                  │
//! │  test                     GET getMedicines, count only                  │
//! │  sync                     flush outbox, then pull (debounced in shell)  │
//! │  push --yes               upload every record                           │
//! │  flush / retry            outbox maintenance                            │
//! │  export / import          JSON backup file                              │
//! │  clear --yes              wipe local data, reload demo catalog          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use pharma_core::Settings;
use pharma_sync::{backup_file_name, DataStore, OutboxCounts, ResyncReport};

use super::{today, Counter};
use crate::cli::{SettingsCommand, ShopFields};
use crate::error::{CliError, CliResult, ErrorCode};
use crate::notify::Notice;

pub async fn run(counter: &mut Counter, action: Option<SettingsCommand>) -> CliResult<String> {
    let store = &counter.store;

    let notice = match action.unwrap_or(SettingsCommand::Show) {
        SettingsCommand::Show => return show(store).await,

        SettingsCommand::Save(fields) => {
            let settings = apply_fields(store.settings().await, fields);
            let saved = store.save_settings(settings).await?;
            Notice::success(format!("Settings saved for {}", saved.shop_name))
        }

        SettingsCommand::Endpoint { url } => {
            let url = url.unwrap_or_default();
            store.set_endpoint(&url).await?;
            if url.trim().is_empty() {
                Notice::info("Endpoint cleared, working offline")
            } else {
                Notice::success("Endpoint saved")
            }
        }

        SettingsCommand::Test => {
            let count = store.test_connection().await?;
            Notice::success(format!("Connected: {} medicines on the endpoint", count))
        }

        SettingsCommand::Sync => match &counter.sync_debouncer {
            Some(debouncer) => {
                let store = Arc::clone(store);
                debouncer.call(async move {
                    match store.resync().await {
                        Ok(report) => info!("{}", describe_resync(&report)),
                        Err(e) => warn!(error = %e, "Sync failed"),
                    }
                });
                Notice::info("Sync scheduled")
            }
            None => {
                let report = store.resync().await?;
                if report.configured {
                    Notice::success(describe_resync(&report))
                } else {
                    Notice::info(describe_resync(&report))
                }
            }
        },

        SettingsCommand::Push { yes } => {
            if !yes {
                return Err(CliError::validation(
                    "Push uploads every local record to the endpoint; run again with --yes",
                ));
            }
            let report = store.push_all().await;
            match report.error {
                None => Notice::success(format!(
                    "Pushed {} medicines, {} bills and settings",
                    report.medicines, report.bills
                )),
                Some(error) => {
                    return Err(CliError::new(
                        ErrorCode::RemoteError,
                        format!(
                            "Push stopped after {} medicines and {} bills: {}",
                            report.medicines, report.bills, error
                        ),
                    ))
                }
            }
        }

        SettingsCommand::Flush => {
            let report = store.flush_outbox().await?;
            Notice::info(format!(
                "Delivered {}, gave up on {}, {} still queued",
                report.delivered, report.given_up, report.remaining
            ))
        }

        SettingsCommand::Retry => {
            let requeued = store.retry_failed_writes().await?;
            Notice::info(format!("{} failed writes queued again", requeued))
        }

        SettingsCommand::Export { out } => {
            let path = backup_path(out);
            let backup = store.export_backup().await;
            let json = backup.to_json_pretty()?;
            std::fs::write(&path, json).map_err(|e| io_error(&path, e))?;
            Notice::success(format!(
                "Backup written to {} ({} medicines, {} bills)",
                path.display(),
                backup.medicines.as_ref().map_or(0, Vec::len),
                backup.bills.as_ref().map_or(0, Vec::len)
            ))
        }

        SettingsCommand::Import { path } => {
            let text = std::fs::read_to_string(&path).map_err(|e| io_error(&path, e))?;
            let report = store.import_backup(&text).await?;
            let mut parts = Vec::new();
            if let Some(n) = report.medicines {
                parts.push(format!("{} medicines", n));
            }
            if let Some(n) = report.bills {
                parts.push(format!("{} bills", n));
            }
            if report.settings {
                parts.push("settings".to_string());
            }
            if parts.is_empty() {
                Notice::info("Backup held nothing to import")
            } else {
                Notice::success(format!("Imported {}", parts.join(", ")))
            }
        }

        SettingsCommand::Clear { yes } => {
            if !yes {
                return Err(CliError::validation(
                    "Clear deletes every medicine, bill and setting; run again with --yes",
                ));
            }
            store.clear_all().await?;
            store.seed_if_empty().await?;
            counter.session.bill.reset();
            Notice::success("All data cleared, demo catalog loaded")
        }
    };

    Ok(notice.to_string())
}

async fn show(store: &DataStore) -> CliResult<String> {
    let settings = store.settings().await;
    let endpoint = store.endpoint().await;
    let configured = store.is_configured().await;
    let outbox = store.outbox_status().await?;
    let medicines = store.medicines_cached().await.len();
    let bills = store.bills_cached().await.len();

    Ok(SettingsView {
        settings: &settings,
        endpoint: &endpoint,
        configured,
        outbox,
        medicines,
        bills,
    }
    .to_string())
}

/// Omitted fields keep their value. A threshold that is not a number
/// becomes 0, which saving turns into the default.
fn apply_fields(mut settings: Settings, fields: ShopFields) -> Settings {
    if let Some(v) = fields.shop_name {
        settings.shop_name = v;
    }
    if let Some(v) = fields.address {
        settings.address = v;
    }
    if let Some(v) = fields.phone {
        settings.phone = v;
    }
    if let Some(v) = fields.gst_number {
        settings.gst_number = v;
    }
    if let Some(v) = fields.license_no {
        settings.license_no = v;
    }
    if let Some(v) = fields.threshold {
        settings.low_stock_threshold = v.trim().parse().unwrap_or(0);
    }
    if let Some(v) = fields.currency {
        settings.currency = v;
    }
    settings
}

/// A directory (or nothing, meaning the current one) gets the dated file
/// name; anything else is used as the file path.
fn backup_path(out: Option<PathBuf>) -> PathBuf {
    let name = backup_file_name(today());
    match out {
        None => PathBuf::from(name),
        Some(dir) if dir.is_dir() => dir.join(name),
        Some(file) => file,
    }
}

fn io_error(path: &Path, err: std::io::Error) -> CliError {
    CliError::new(ErrorCode::IoError, format!("{}: {}", path.display(), err))
}

fn describe_resync(report: &ResyncReport) -> String {
    if !report.configured {
        return "No endpoint configured, showing local data".to_string();
    }
    let count = |n: Option<usize>| n.map_or_else(|| "unchanged".to_string(), |n| n.to_string());
    format!(
        "Synced: {} queued writes sent, settings {}, medicines {}, bills {}",
        report.flushed,
        if report.settings { "merged" } else { "unchanged" },
        count(report.medicines),
        count(report.bills)
    )
}

struct SettingsView<'a> {
    settings: &'a Settings,
    endpoint: &'a str,
    configured: bool,
    outbox: OutboxCounts,
    medicines: usize,
    bills: usize,
}

impl fmt::Display for SettingsView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.settings;
        let blank = |v: &str| if v.is_empty() { "-".to_string() } else { v.to_string() };

        writeln!(f, "Shop")?;
        writeln!(f, "  Name        {}", s.shop_name)?;
        writeln!(f, "  Address     {}", blank(&s.address))?;
        writeln!(f, "  Phone       {}", blank(&s.phone))?;
        writeln!(f, "  GSTIN       {}", blank(&s.gst_number))?;
        writeln!(f, "  License     {}", blank(&s.license_no))?;
        writeln!(f, "  Currency    {}", s.currency)?;
        writeln!(f, "  Low stock   {} units or fewer", s.threshold())?;
        writeln!(f)?;
        writeln!(f, "Sync")?;
        writeln!(
            f,
            "  Endpoint    {}",
            if self.endpoint.is_empty() { "not set" } else { self.endpoint }
        )?;
        writeln!(
            f,
            "  Status      {}",
            if self.configured { "connected" } else { "offline" }
        )?;
        writeln!(
            f,
            "  Outbox      {} pending, {} failed",
            self.outbox.pending, self.outbox.failed
        )?;
        writeln!(f)?;
        write!(
            f,
            "Local data    {} medicines, {} bills",
            self.medicines, self.bills
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::seeded_counter;

    #[tokio::test]
    async fn test_show_defaults() {
        let mut counter = seeded_counter().await;
        let out = run(&mut counter, None).await.unwrap();
        assert!(out.contains("Name        MediCare Pharmacy"));
        assert!(out.contains("Endpoint    not set"));
        assert!(out.contains("Status      offline"));
        assert!(out.contains("0 pending, 0 failed"));
        assert!(out.contains("10 medicines, 4 bills"));
    }

    #[tokio::test]
    async fn test_save_keeps_omitted_fields_and_normalizes() {
        let mut counter = seeded_counter().await;
        let before = counter.store.settings().await;

        run(
            &mut counter,
            Some(SettingsCommand::Save(ShopFields {
                shop_name: Some("  ".into()),
                phone: Some("98765 43210".into()),
                threshold: Some("plenty".into()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();

        let after = counter.store.settings().await;
        assert_eq!(after.shop_name, "MediCare Pharmacy");
        assert_eq!(after.phone, "98765 43210");
        assert_eq!(after.low_stock_threshold, 10);
        assert_eq!(after.address, before.address);

        run(
            &mut counter,
            Some(SettingsCommand::Save(ShopFields {
                threshold: Some("25".into()),
                ..Default::default()
            })),
        )
        .await
        .unwrap();
        assert_eq!(counter.store.settings().await.low_stock_threshold, 25);
    }

    #[tokio::test]
    async fn test_endpoint_prefix_is_enforced() {
        let mut counter = seeded_counter().await;
        let err = run(
            &mut counter,
            Some(SettingsCommand::Endpoint {
                url: Some("https://example.com/exec".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);

        let out = run(
            &mut counter,
            Some(SettingsCommand::Endpoint {
                url: Some("https://script.google.com/macros/s/abc/exec".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(out, "✓ Endpoint saved");
        assert!(counter.store.is_configured().await);

        let out = run(&mut counter, Some(SettingsCommand::Endpoint { url: None }))
            .await
            .unwrap();
        assert_eq!(out, "ℹ Endpoint cleared, working offline");
        assert!(!counter.store.is_configured().await);
    }

    #[tokio::test]
    async fn test_offline_sync_actions() {
        let mut counter = seeded_counter().await;

        let out = run(&mut counter, Some(SettingsCommand::Sync)).await.unwrap();
        assert_eq!(out, "ℹ No endpoint configured, showing local data");

        let err = run(&mut counter, Some(SettingsCommand::Flush))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigError);

        let err = run(&mut counter, Some(SettingsCommand::Push { yes: false }))
            .await
            .unwrap_err();
        assert!(err.message.contains("--yes"));

        let err = run(&mut counter, Some(SettingsCommand::Push { yes: true }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RemoteError);
    }

    #[tokio::test]
    async fn test_sync_is_debounced_in_the_shell() {
        let counter = seeded_counter().await;
        let mut counter = counter.with_sync_debouncer();

        let out = run(&mut counter, Some(SettingsCommand::Sync)).await.unwrap();
        assert_eq!(out, "ℹ Sync scheduled");
        assert!(counter.sync_debouncer.as_ref().unwrap().is_pending());
    }

    #[tokio::test]
    async fn test_export_then_import_restores() {
        let mut counter = seeded_counter().await;
        let dir = tempfile::tempdir().unwrap();

        let out = run(
            &mut counter,
            Some(SettingsCommand::Export {
                out: Some(dir.path().to_path_buf()),
            }),
        )
        .await
        .unwrap();
        assert!(out.contains("(10 medicines, 4 bills)"));
        let file = dir.path().join(backup_file_name(today()));
        assert!(file.exists());

        run(&mut counter, Some(SettingsCommand::Clear { yes: true }))
            .await
            .unwrap();
        assert!(counter.store.bills_cached().await.len() == 4);
        counter.store.clear_all().await.unwrap();
        assert!(counter.store.medicines_cached().await.is_empty());

        let out = run(&mut counter, Some(SettingsCommand::Import { path: file }))
            .await
            .unwrap();
        assert_eq!(out, "✓ Imported 10 medicines, 4 bills, settings");
        assert_eq!(counter.store.medicines_cached().await.len(), 10);
    }

    #[tokio::test]
    async fn test_import_rejects_garbage_and_clear_needs_yes() {
        let mut counter = seeded_counter().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "not json").unwrap();

        let err = run(&mut counter, Some(SettingsCommand::Import { path }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(counter.store.medicines_cached().await.len(), 10);

        let err = run(&mut counter, Some(SettingsCommand::Clear { yes: false }))
            .await
            .unwrap_err();
        assert!(err.message.contains("--yes"));

        let err = run(
            &mut counter,
            Some(SettingsCommand::Import {
                path: dir.path().join("missing.json"),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::IoError);
    }
}
