//! # Application Configuration
//!
//! Settings loaded once at startup.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     PHARMA_DB_PATH=/srv/pharmacy.db                                     │
//! │     PHARMA_ENDPOINT_PREFIX=https://script.google.com                    │
//! │     PHARMA_SEED_DEMO=false                                              │
//! │                                                                         │
//! │  2. TOML Config File (--config, or the platform default)               │
//! │     ~/.config/pos/config.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.pharma.pos/config.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [storage]
//! db_path = "/srv/pharmacy/pharmacy.db"
//!
//! [remote]
//! endpoint_prefix = "https://script.google.com"
//!
//! [outbox]
//! max_attempts = 5
//! keep_synced_days = 7
//!
//! [app]
//! seed_demo = true
//! stock_page_size = 10
//! sales_page_size = 15
//! sync_debounce_ms = 300
//! ```
//!
//! Shop details (name, GSTIN, threshold) are not here: they are shop data
//! and live in the cache with the rest of it.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use pharma_core::page::{SALES_PAGE_SIZE, STOCK_PAGE_SIZE};
use pharma_sync::config::ENV_ENDPOINT_PREFIX;
use pharma_sync::{OutboxSettings, RemoteSettings, SyncConfig, SyncError, SyncResult};

pub const ENV_DB_PATH: &str = "PHARMA_DB_PATH";
pub const ENV_SEED_DEMO: &str = "PHARMA_SEED_DEMO";

const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "pharmacy.db";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Write the demo catalog when the cache has no medicines.
    #[serde(default = "default_true")]
    pub seed_demo: bool,

    #[serde(default = "default_stock_page_size")]
    pub stock_page_size: usize,

    #[serde(default = "default_sales_page_size")]
    pub sales_page_size: usize,

    /// Quiet period before a requested sync actually runs.
    #[serde(default = "default_sync_debounce_ms")]
    pub sync_debounce_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_stock_page_size() -> usize {
    STOCK_PAGE_SIZE
}

fn default_sales_page_size() -> usize {
    SALES_PAGE_SIZE
}

fn default_sync_debounce_ms() -> u64 {
    300
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            seed_demo: default_true(),
            stock_page_size: default_stock_page_size(),
            sales_page_size: default_sales_page_size(),
            sync_debounce_ms: default_sync_debounce_ms(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub outbox: OutboxSettings,

    #[serde(default)]
    pub app: AppSettings,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// An explicit path must exist; the default path may be absent.
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let explicit = config_path.is_some();
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else if explicit {
                return Err(SyncError::ConfigLoadFailed(format!(
                    "{} does not exist",
                    path.display()
                )));
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> SyncResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SyncError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&contents)
            .map_err(|e| SyncError::ConfigLoadFailed(format!("{}: {}", path.display(), e)))
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> SyncResult<()> {
        self.sync_config().validate()?;

        if self.app.stock_page_size == 0 || self.app.sales_page_size == 0 {
            return Err(SyncError::InvalidConfig(
                "page sizes must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.db_path = Some(PathBuf::from(path));
        }

        if let Ok(prefix) = std::env::var(ENV_ENDPOINT_PREFIX) {
            debug!(prefix = %prefix, "Overriding endpoint prefix from environment");
            self.remote.endpoint_prefix = prefix;
        }

        if let Ok(flag) = std::env::var(ENV_SEED_DEMO) {
            match parse_flag(&flag) {
                Some(seed) => self.app.seed_demo = seed,
                None => warn!(value = %flag, "Unknown {} value, ignoring", ENV_SEED_DEMO),
            }
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "pharma", "pos")
    }

    pub fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// The SQLite file to open, creating its directory if needed.
    pub fn database_path(&self) -> SyncResult<PathBuf> {
        let path = match &self.storage.db_path {
            Some(path) => path.clone(),
            None => Self::project_dirs()
                .map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
                .ok_or_else(|| {
                    SyncError::InvalidConfig("Could not determine app data directory".into())
                })?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    /// The sections the data facade needs.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            remote: self.remote.clone(),
            outbox: self.outbox.clone(),
        }
    }

    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.app.sync_debounce_ms)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
