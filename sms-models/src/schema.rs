//! Database schema definitions.
//!
//! The message collection is keyed by message identifier and carries one
//! secondary index per queryable field. The collection itself is created by
//! the version 0 -> 1 schema upgrade; only the version bookkeeping table is
//! created unconditionally.

use rusqlite::Connection;
use sms_core::error::{SmsError, SmsResult};
use tracing::{debug, info};

/// Create the bookkeeping tables if they do not exist.
pub fn create_tables(conn: &Connection) -> SmsResult<()> {
    conn.execute_batch(VERSION_TABLE_SQL)
        .map_err(|e| SmsError::Database(format!("failed to create schema: {e}")))?;
    debug!("schema version table verified");
    Ok(())
}

/// Create the message collection and its indexes.
pub fn create_object_store(conn: &Connection) -> SmsResult<()> {
    conn.execute_batch(MESSAGE_STORE_SQL)
        .map_err(|e| SmsError::Database(format!("failed to create message store: {e}")))?;
    info!("created message store and indexes");
    Ok(())
}

/// Drop all tables (used for database reset).
pub fn drop_tables(conn: &Connection) -> SmsResult<()> {
    conn.execute_batch(
        "DROP TABLE IF EXISTS messages;
         DROP TABLE IF EXISTS schema_version;",
    )
    .map_err(|e| SmsError::Database(format!("failed to drop tables: {e}")))?;
    Ok(())
}

const VERSION_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

const MESSAGE_STORE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,
    delivery    TEXT NOT NULL CHECK (delivery IN ('sent', 'received')),
    sender      TEXT NOT NULL,
    receiver    TEXT NOT NULL,
    body        TEXT NOT NULL,
    timestamp   INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_messages_id ON messages(id);
CREATE INDEX IF NOT EXISTS idx_messages_delivery ON messages(delivery, id);
CREATE INDEX IF NOT EXISTS idx_messages_sender ON messages(sender, id);
CREATE INDEX IF NOT EXISTS idx_messages_receiver ON messages(receiver, id);
CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages(timestamp, id);
"#;
