//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "SmsStore";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default database file name inside the data directory.
pub const DB_FILE_NAME: &str = "sms.db";

/// Database schema version.
pub const DB_SCHEMA_VERSION: i32 = 1;

/// Stored values of the `delivery` field.
pub mod delivery {
    pub const SENT: &str = "sent";
    pub const RECEIVED: &str = "received";

    /// All valid delivery values.
    pub const ALL: &[&str] = &[SENT, RECEIVED];
}
