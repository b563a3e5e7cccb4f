//! # Backup Files
//!
//! The shop's data as a single JSON document:
//!
//! ```json
//! { "medicines": [...], "bills": [...], "settings": {...}, "exportedAt": "2026-10-16T09:00:00Z" }
//! ```
//!
//! Import replaces each collection that is present and leaves missing ones
//! alone. Records keep their ids.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use pharma_core::{Bill, Medicine, Settings};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medicines: Option<Vec<Medicine>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bills: Option<Vec<Bill>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,

    #[serde(
        rename = "exportedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub exported_at: Option<DateTime<Utc>>,
}

impl Backup {
    /// A full backup of the given state.
    pub fn full(
        medicines: Vec<Medicine>,
        bills: Vec<Bill>,
        settings: Settings,
        now: DateTime<Utc>,
    ) -> Self {
        Backup {
            medicines: Some(medicines),
            bills: Some(bills),
            settings: Some(settings),
            exported_at: Some(now),
        }
    }

    /// Parses backup text. Anything that is not a backup object is rejected.
    pub fn parse(text: &str) -> SyncResult<Self> {
        serde_json::from_str(text).map_err(|e| SyncError::InvalidBackup(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// `pharmacy-backup-2026-10-16.json`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("pharmacy-backup-{}.json", date.format("%Y-%m-%d"))
}

/// What an import replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub medicines: Option<usize>,
    pub bills: Option<usize>,
    pub settings: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharma_core::seed::demo_medicines;

    #[test]
    fn test_export_shape() {
        let now = "2026-10-16T09:00:00Z".parse().unwrap();
        let backup = Backup::full(demo_medicines(now), Vec::new(), Settings::default(), now);
        let value: serde_json::Value =
            serde_json::from_str(&backup.to_json_pretty().unwrap()).unwrap();

        assert_eq!(value["medicines"].as_array().unwrap().len(), 10);
        assert_eq!(value["bills"], serde_json::json!([]));
        assert_eq!(value["settings"]["shop_name"], "MediCare Pharmacy");
        assert!(value["exportedAt"].as_str().unwrap().starts_with("2026-10-16T09:00:00"));
    }

    #[test]
    fn test_partial_backup() {
        let backup = Backup::parse(r#"{"settings":{"shop_name":"Apollo Corner"}}"#).unwrap();
        assert!(backup.medicines.is_none());
        assert!(backup.bills.is_none());
        assert_eq!(backup.settings.unwrap().shop_name, "Apollo Corner");
    }

    #[test]
    fn test_invalid_backup_is_rejected() {
        assert!(matches!(
            Backup::parse("{oops"),
            Err(SyncError::InvalidBackup(_))
        ));
        assert!(Backup::parse(r#"{"medicines": "lots"}"#).is_err());
        assert!(Backup::parse("42").is_err());
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 6).unwrap();
        assert_eq!(backup_file_name(date), "pharmacy-backup-2026-10-06.json");
    }
}
