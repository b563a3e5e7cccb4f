//! # State Module
//!
//! Application state for the counter app, split by lifetime:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐  │
//! │  │   AppConfig      │  │  Arc<DataStore>  │  │   SessionState       │  │
//! │  │                  │  │                  │  │                      │  │
//! │  │  TOML + env      │  │  cache, outbox,  │  │  page, cart,         │  │
//! │  │  read-only after │  │  endpoint client │  │  filters             │  │
//! │  │  startup         │  │  (pharma-sync)   │  │  (one shell session) │  │
//! │  └──────────────────┘  └──────────────────┘  └──────────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • DataStore: shared with the background sync task via Arc             │
//! │  • SessionState: owned by the shell loop, never shared                 │
//! │  • AppConfig: read-only after initialization                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod session;

pub use config::{AppConfig, AppSettings, StorageSettings, ENV_DB_PATH, ENV_SEED_DEMO};
pub use session::{BillInProgress, Page, SessionState};
