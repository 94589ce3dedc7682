//! SMS Models - Message records, filters, and the persisted indexed store.
//!
//! This crate owns all data persistence: SQLite database initialization and
//! pooling, versioned schema upgrades, the message record and its codec,
//! message filters, and the `RecordStore` abstraction with its SQLite
//! implementation.

pub mod db;
pub mod schema;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod store;
pub mod sqlite_store;

// Re-export key types
pub use db::{Database, DbPool};
pub use models::filter::{MessageFilter, TimeRange};
pub use models::message::{Delivery, Message, MessageRecord};
pub use sqlite_store::SqliteStore;
pub use store::{IndexKey, IndexName, KeyRange, RecordStore, ScanEntry, Scope, ScopeMode, SortDirection};
