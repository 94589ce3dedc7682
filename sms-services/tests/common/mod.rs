//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sms_core::config::{AppConfig, DatabaseConfig};
use sms_models::{Database, SqliteStore};
use sms_services::MessageStoreService;
use tempfile::TempDir;

/// Address of the device under test.
pub const OWN_ADDRESS: &str = "+15550000000";

/// Open a temporary database with the schema applied.
/// Returns the Database and the TempDir (must be held alive for the duration of the test).
pub fn create_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("test.db");
    let db = Database::open(&path, &DatabaseConfig::default()).expect("failed to open test database");
    (db, dir)
}

/// Create a store on a temporary database file. Nothing is opened yet.
pub fn create_test_store() -> (Arc<SqliteStore>, TempDir) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let store = SqliteStore::new(dir.path().join("test.db"), DatabaseConfig::default());
    (Arc::new(store), dir)
}

/// Create a message store service on a temporary database.
pub fn create_test_service() -> (MessageStoreService, TempDir) {
    let (store, dir) = create_test_store();
    (MessageStoreService::new(store, OWN_ADDRESS), dir)
}

/// Create a configuration pointing at a database inside `dir`.
pub fn create_test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.path = dir.path().join("config.db").to_string_lossy().into_owned();
    config.sms.own_address = OWN_ADDRESS.to_string();
    config
}

/// Timestamp `ms` milliseconds after the Unix epoch.
pub fn at(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

/// Identifiers of the seeded conversation, in the order they were saved.
pub struct Seeded {
    /// Sent to +15551110001 at t=100.
    pub to_alice: String,
    /// Received from +15551110001 at t=200.
    pub from_alice: String,
    /// Sent to +15552220002 at t=300.
    pub to_bob: String,
    /// Received from +15553330003 at t=400.
    pub from_carol: String,
    /// Received from +15552220002 at t=500.
    pub from_bob: String,
}

pub const ALICE: &str = "+15551110001";
pub const BOB: &str = "+15552220002";
pub const CAROL: &str = "+15553330003";

/// Save a small conversation with three contacts.
pub async fn seed_conversation(service: &MessageStoreService) -> Seeded {
    Seeded {
        to_alice: service.save_sent_message(ALICE, "hi alice", at(100)).await.unwrap(),
        from_alice: service.save_received_message(ALICE, "hi back", at(200)).await.unwrap(),
        to_bob: service.save_sent_message(BOB, "hi bob", at(300)).await.unwrap(),
        from_carol: service.save_received_message(CAROL, "hello", at(400)).await.unwrap(),
        from_bob: service.save_received_message(BOB, "yo", at(500)).await.unwrap(),
    }
}

/// Drain a message list and return the identifiers in order.
pub async fn drain(service: &MessageStoreService, handle: &str, first: Option<String>) -> Vec<String> {
    let mut ids: Vec<String> = first.into_iter().collect();
    while let Some(message) = service.get_next_message_in_list(handle).await.unwrap() {
        ids.push(message.id);
    }
    ids
}
