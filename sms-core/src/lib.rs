//! SMS Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other SMS store crates:
//! - Application configuration (database, logging, own address)
//! - A single error type with stable numeric error codes
//! - Structured logging with tracing
//! - Platform data/config directories
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{SmsError, SmsErrorCode, SmsResult};
pub use logging::init_logging;
pub use platform::Platform;
