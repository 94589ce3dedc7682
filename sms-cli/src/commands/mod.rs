//! CLI command implementations.

pub mod messages;
pub mod db;

use chrono::{DateTime, TimeZone, Utc};

use sms_core::config::ConfigHandle;
use sms_core::error::{SmsError, SmsResult};
use sms_models::Database;
use sms_services::{MessageStoreService, Service};

/// Helper to open the database from config.
pub async fn init_database(config: &ConfigHandle) -> SmsResult<Database> {
    let config = config.read().await;
    let db_path = config.effective_db_path()?;
    Database::open(&db_path, &config.database)
}

/// Helper to build and initialize the message store service from config.
pub async fn init_service(config: &ConfigHandle) -> SmsResult<MessageStoreService> {
    let mut service = MessageStoreService::from_config(&*config.read().await)?;
    service.init().await?;
    Ok(service)
}

/// Parse a timestamp given as RFC 3339 or as milliseconds since the epoch.
pub fn parse_timestamp(value: &str) -> SmsResult<DateTime<Utc>> {
    if let Ok(millis) = value.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| SmsError::InvalidArgument(format!("timestamp out of range: {value}")));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SmsError::InvalidArgument(format!("invalid timestamp '{value}': {e}")))
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
