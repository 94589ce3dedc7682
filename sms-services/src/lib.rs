//! SMS Services - Message store service layer.
//!
//! This crate provides the service lifecycle trait and the message store
//! service built on top of the record store:
//! - Saving, fetching, updating and deleting messages
//! - Filtered queries combining several index scans
//! - Message lists paged through by handle

pub mod service;
pub mod query;
pub mod message_list;
pub mod message;

// Re-export key types
pub use service::{Service, ServiceState};
pub use query::QueryEngine;
pub use message_list::MessageListManager;
pub use message::{MessageRef, MessageStoreService};
