//! # Repository Layer
//!
//! ```text
//! Database
//! ├── cache()   → CacheStore        documents by key (medicines, bills, ...)
//! └── outbox()  → OutboxRepository  remote writes waiting for delivery
//! ```
//!
//! Each repository owns a clone of the pool and keeps its SQL to itself.

pub mod cache;
pub mod outbox;
