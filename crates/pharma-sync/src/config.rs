//! # Sync Configuration
//!
//! Settings that govern how the facade talks to the spreadsheet endpoint.
//!
//! ```toml
//! [remote]
//! endpoint_prefix = "https://script.google.com"
//! user_agent = "pharma-pos/0.1"
//!
//! [outbox]
//! max_attempts = 5
//! batch_size = 50
//! ```
//!
//! The endpoint URL itself is not configuration: it is shop data, stored in
//! the cache under `pharma_sheets_url` and edited from the settings page.
//! These sections are embedded in the application's TOML file; the loader
//! lives with the binary.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Endpoints must start with this unless configured otherwise.
pub const DEFAULT_ENDPOINT_PREFIX: &str = "https://script.google.com";

/// Environment variable overriding [`RemoteSettings::endpoint_prefix`].
pub const ENV_ENDPOINT_PREFIX: &str = "PHARMA_ENDPOINT_PREFIX";

// =============================================================================
// Remote Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// An endpoint counts as configured only when it starts with this.
    #[serde(default = "default_endpoint_prefix")]
    pub endpoint_prefix: String,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_endpoint_prefix() -> String {
    DEFAULT_ENDPOINT_PREFIX.to_string()
}

fn default_user_agent() -> String {
    concat!("pharma-pos/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            endpoint_prefix: default_endpoint_prefix(),
            user_agent: default_user_agent(),
        }
    }
}

impl RemoteSettings {
    /// Whether an endpoint URL is usable. Empty means "not configured".
    pub fn accepts(&self, endpoint: &str) -> bool {
        !endpoint.is_empty() && endpoint.starts_with(&self.endpoint_prefix)
    }
}

// =============================================================================
// Outbox Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxSettings {
    /// Failed deliveries before an entry is parked as `failed`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,

    /// Entries replayed per flush.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Delivered entries are pruned after this many days.
    #[serde(default = "default_keep_synced_days")]
    pub keep_synced_days: u32,
}

fn default_max_attempts() -> i64 {
    5
}

fn default_batch_size() -> u32 {
    50
}

fn default_keep_synced_days() -> u32 {
    7
}

impl Default for OutboxSettings {
    fn default() -> Self {
        OutboxSettings {
            max_attempts: default_max_attempts(),
            batch_size: default_batch_size(),
            keep_synced_days: default_keep_synced_days(),
        }
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub outbox: OutboxSettings,
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        let prefix = &self.remote.endpoint_prefix;
        let parsed = url::Url::parse(prefix)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::InvalidUrl(format!(
                "Endpoint prefix must be http(s), got: {}",
                prefix
            )));
        }

        if self.outbox.max_attempts < 1 {
            return Err(SyncError::InvalidConfig(
                "outbox.max_attempts must be at least 1".into(),
            ));
        }
        if self.outbox.batch_size == 0 {
            return Err(SyncError::InvalidConfig(
                "outbox.batch_size must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(prefix) = std::env::var(ENV_ENDPOINT_PREFIX) {
            debug!(prefix = %prefix, "Overriding endpoint prefix from environment");
            self.remote.endpoint_prefix = prefix;
        }
    }
}
