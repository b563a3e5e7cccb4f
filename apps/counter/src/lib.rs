//! # Pharmacy Counter Library
//!
//! Terminal front end of the pharmacy POS: every page of the counter as a
//! command, usable one at a time or from the interactive shell.
//!
//! ## Module Organization
//! ```text
//! pharma_counter/
//! ├── lib.rs          ◄─── You are here (startup: logging, config, store)
//! ├── cli.rs          ◄─── clap command tree, shell line splitting
//! ├── shell.rs        ◄─── Interactive loop (router)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── TOML configuration + env overrides
//! │   └── session.rs  ◄─── Current page, cart, page filters
//! ├── commands/       ◄─── One module per page
//! ├── debounce.rs     ◄─── Coalesces repeated sync requests
//! ├── notify.rs       ◄─── ✓ / ℹ / ✗ one-line notices
//! └── error.rs        ◄─── CliError and exit codes
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Initialize Logging ─────────── stderr, RUST_LOG or default filter   │
//! │  2. Load AppConfig ─────────────── --config, platform dir, env          │
//! │  3. Open SQLite cache ──────────── migrations run on connect            │
//! │  4. Build DataStore ────────────── cache + outbox + endpoint client     │
//! │  5. Seed demo catalog if empty ─── when app.seed_demo                   │
//! │  6. Run one command, or start the shell                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod commands;
pub mod debounce;
pub mod error;
pub mod notify;
pub mod shell;
pub mod state;

use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use pharma_db::{Database, DbConfig};
use pharma_sync::DataStore;

use cli::{Cli, Command};
use commands::Counter;
use error::CliResult;
use state::AppConfig;

/// Runs what the command line asked for.
pub async fn run(cli: Cli) -> CliResult<()> {
    let config = AppConfig::load(cli.config.clone())?;
    let store = open_store(&config).await?;

    let mut counter = Counter::new(store, config);
    counter.config_path = cli.config;

    match cli.command {
        None | Some(Command::Shell) => shell::run(counter.with_sync_debouncer()).await,
        Some(command) => {
            if counter.config.app.seed_demo {
                counter.store.seed_if_empty().await?;
            }
            let output = commands::execute(&mut counter, command).await?;
            println!("{}", output);
            Ok(())
        }
    }
}

/// Opens the local cache and wraps it in the data facade.
pub async fn open_store(config: &AppConfig) -> CliResult<Arc<DataStore>> {
    let path = config.database_path()?;
    let db = Database::new(DbConfig::new(&path)).await?;
    let store = DataStore::new(db, config.sync_config())?;
    info!(
        path = %path.display(),
        configured = store.is_configured().await,
        "Data store ready"
    );
    Ok(Arc::new(store))
}

/// Initializes the tracing subscriber for structured logging.
///
/// Logs go to stderr so page output on stdout stays clean.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=pharma=trace` - Show trace for pharma crates only
/// - Default: INFO, DEBUG for pharma crates, WARN for sqlx
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pharma=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.db_path = Some(dir.path().join("data").join("pharmacy.db"));

        let store = open_store(&config).await.unwrap();
        assert!(!store.is_configured().await);
        assert!(store.seed_if_empty().await.unwrap());
        assert!(dir.path().join("data").join("pharmacy.db").exists());
    }
}
