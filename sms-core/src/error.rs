//! Global error types for the SMS message store.
//!
//! Every failure surfaced by the store, the query engine, or the list
//! manager is a `SmsError`. Each variant maps to a stable numeric
//! `SmsErrorCode` that callers across a process boundary can rely on.

use thiserror::Error;

/// Convenience type alias for Results using SmsError.
pub type SmsResult<T> = Result<T, SmsError>;

/// Unified error type covering all error categories of the message store.
#[derive(Error, Debug)]
pub enum SmsError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- Caller errors --
    /// Malformed filter, identifier, or field value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No record is stored under the given identifier.
    #[error("message not found: {0}")]
    MessageNotFound(String),

    /// The message list handle is unknown or has been disposed.
    #[error("invalid message list handle: {0}")]
    InvalidHandle(String),

    /// The caller is not allowed to perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    // -- Store errors --
    /// The backing store failed to open, run a scope, or commit.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Database integrity check failed.
    #[error("database integrity check failed: {0}")]
    IntegrityCheck(String),

    /// The store is busy or not ready yet; the operation may be retried.
    #[error("operation pending: {0}")]
    PendingOperation(String),

    /// The stored schema version has no upgrade path.
    #[error("not supported: {0}")]
    NotSupported(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SmsError {
    /// The caller-facing error code for this error.
    pub fn code(&self) -> SmsErrorCode {
        match self {
            Self::InvalidArgument(_) => SmsErrorCode::InvalidArgument,
            Self::MessageNotFound(_) | Self::InvalidHandle(_) => SmsErrorCode::NotFound,
            Self::PermissionDenied(_) => SmsErrorCode::PermissionDenied,
            Self::PendingOperation(_) => SmsErrorCode::PendingOperation,
            Self::NotSupported(_) => SmsErrorCode::NotSupported,
            Self::Database(_)
            | Self::Pool(_)
            | Self::IntegrityCheck(_)
            | Self::Io(_) => SmsErrorCode::IoError,
            Self::Config(_)
            | Self::Serialization(_)
            | Self::Internal(_)
            | Self::Other(_) => SmsErrorCode::Unknown,
        }
    }

    /// Whether this error reports a missing record or list.
    pub fn is_not_found(&self) -> bool {
        self.code() == SmsErrorCode::NotFound
    }
}

impl From<serde_json::Error> for SmsError {
    fn from(e: serde_json::Error) -> Self {
        SmsError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SmsError {
    fn from(e: toml::de::Error) -> Self {
        SmsError::Config(e.to_string())
    }
}

/// Numeric error codes reported to callers of the message store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(i32)]
pub enum SmsErrorCode {
    /// Catch-all.
    Unknown = 0,
    /// Malformed filter or identifier.
    InvalidArgument = 1,
    /// Request timed out.
    Timeout = 2,
    /// Store not ready yet.
    PendingOperation = 3,
    /// Store failed to open, upgrade, or commit.
    IoError = 4,
    /// Unsupported schema version or operation.
    NotSupported = 5,
    /// No record for the given id, or unknown list handle.
    NotFound = 6,
    /// Permission denied.
    PermissionDenied = 20,
}

impl SmsErrorCode {
    /// Convert an integer code to a SmsErrorCode variant.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::InvalidArgument,
            2 => Self::Timeout,
            3 => Self::PendingOperation,
            4 => Self::IoError,
            5 => Self::NotSupported,
            6 => Self::NotFound,
            20 => Self::PermissionDenied,
            _ => Self::Unknown,
        }
    }

    /// Get the integer code for this error.
    pub fn code(&self) -> i32 {
        *self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_roundtrip() {
        let code = SmsErrorCode::PendingOperation;
        assert_eq!(code.code(), 3);
        assert_eq!(SmsErrorCode::from_code(3), SmsErrorCode::PendingOperation);
        assert_eq!(SmsErrorCode::from_code(20), SmsErrorCode::PermissionDenied);
    }

    #[test]
    fn test_error_code_unknown() {
        assert_eq!(SmsErrorCode::from_code(42), SmsErrorCode::Unknown);
    }

    #[test]
    fn test_store_failures_report_io_error() {
        assert_eq!(SmsError::Database("commit failed".into()).code(), SmsErrorCode::IoError);
        assert_eq!(SmsError::Pool("exhausted".into()).code(), SmsErrorCode::IoError);
    }

    #[test]
    fn test_missing_handle_is_not_found() {
        let err = SmsError::InvalidHandle("abc".into());
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "invalid message list handle: abc");
    }

    #[test]
    fn test_sms_error_display() {
        let err = SmsError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }
}
