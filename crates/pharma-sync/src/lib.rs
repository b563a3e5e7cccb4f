//! # pharma-sync: Data Access and Spreadsheet Sync for the Pharmacy POS
//!
//! The shop's data lives in a local cache first. When an endpoint URL is
//! configured, writes are mirrored to a spreadsheet web app and reads are
//! refreshed from it.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Data Access Layer                               │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                   DataStore (store.rs)                           │  │
//! │  │                                                                  │  │
//! │  │  medicines / bills / settings verbs used by every page           │  │
//! │  │  push_all, resync, flush_outbox, backup import/export            │  │
//! │  └───────────────┬──────────────────────────────┬───────────────────┘  │
//! │                  │                              │                       │
//! │                  ▼                              ▼                       │
//! │  ┌────────────────────────────┐  ┌─────────────────────────────────┐   │
//! │  │ pharma-db                  │  │ RemoteClient (client.rs)        │   │
//! │  │                            │  │                                 │   │
//! │  │ CacheStore   (documents)   │  │ GET ?action=getMedicines        │   │
//! │  │ Outbox       (failed       │  │ POST {action, id?, data?}       │   │
//! │  │               writes)      │  │                                 │   │
//! │  └────────────────────────────┘  └───────────────┬─────────────────┘   │
//! │                                                  │                      │
//! │                                  ┌───────────────▼─────────────────┐   │
//! │                                  │ wire.rs: lenient remote records │   │
//! │                                  │ protocol.rs: request envelopes  │   │
//! │                                  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`] - The `DataStore` facade
//! - [`client`] - HTTP client for the endpoint
//! - [`protocol`] - Read actions, write requests, response envelope
//! - [`wire`] - Remote record shapes and their lenient decoding
//! - [`backup`] - Backup document and file naming
//! - [`config`] - Endpoint prefix, user agent, outbox limits
//! - [`error`] - Sync error types

pub mod backup;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod store;
pub mod wire;

pub use backup::{backup_file_name, Backup, ImportReport};
pub use client::RemoteClient;
pub use config::{OutboxSettings, RemoteSettings, SyncConfig};
pub use error::{SyncError, SyncResult};
pub use store::{DataStore, FlushReport, PushReport, ResyncReport};

pub use pharma_db::OutboxCounts;
