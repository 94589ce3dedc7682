//! Integration tests for the message store service.
//!
//! Tests saving and fetching messages, deletion, idempotent re-save,
//! per-message handles, service lifecycle, and construction from config.

mod common;

use common::{at, ALICE, BOB, OWN_ADDRESS};
use sms_core::error::{SmsError, SmsErrorCode};
use sms_models::{Delivery, MessageRecord};
use sms_services::service::{Service, ServiceState};
use sms_services::MessageStoreService;
use tempfile::TempDir;

// ---- Save and get ----

#[tokio::test]
async fn saved_sent_message_round_trips() {
    let (service, _dir) = common::create_test_service();
    let id = service.save_sent_message(ALICE, "hello there", at(1_700_000_000_123)).await.unwrap();
    assert!(!id.is_empty());

    let message = service.get_message(&id).await.unwrap();
    assert_eq!(message.id, id);
    assert_eq!(message.delivery, Delivery::Sent);
    assert_eq!(message.sender, OWN_ADDRESS);
    assert_eq!(message.receiver, ALICE);
    assert_eq!(message.body, "hello there");
    assert_eq!(message.timestamp, at(1_700_000_000_123));
}

#[tokio::test]
async fn saved_received_message_uses_own_address_as_receiver() {
    let (service, _dir) = common::create_test_service();
    let id = service.save_received_message(BOB, "ping", at(42)).await.unwrap();

    let message = service.get_message(&id).await.unwrap();
    assert_eq!(message.delivery, Delivery::Received);
    assert_eq!(message.sender, BOB);
    assert_eq!(message.receiver, OWN_ADDRESS);
}

#[tokio::test]
async fn each_save_assigns_a_distinct_id() {
    let (service, _dir) = common::create_test_service();
    let first = service.save_sent_message(ALICE, "same", at(1)).await.unwrap();
    let second = service.save_sent_message(ALICE, "same", at(1)).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(service.get_all_messages().await.unwrap().len(), 2);
}

#[tokio::test]
async fn resaving_a_stored_message_keeps_its_id() {
    let (service, _dir) = common::create_test_service();
    let id = service.save_sent_message(ALICE, "draft", at(10)).await.unwrap();

    let mut record = MessageRecord::from(service.get_message(&id).await.unwrap());
    record.body = "final".to_string();
    let resaved = service.save_message(record).await.unwrap();

    assert_eq!(resaved, id);
    let all = service.get_all_messages().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].body, "final");
}

#[tokio::test]
async fn save_without_own_address_is_rejected() {
    let (store, _dir) = common::create_test_store();
    let service = MessageStoreService::new(store, "");
    let err = service.save_sent_message(ALICE, "x", at(1)).await.unwrap_err();
    assert!(matches!(err, SmsError::InvalidArgument(_)));
    assert_eq!(err.code(), SmsErrorCode::InvalidArgument);
}

#[tokio::test]
async fn save_with_blank_counterpart_is_rejected() {
    let (service, _dir) = common::create_test_service();
    let err = service.save_received_message("  ", "x", at(1)).await.unwrap_err();
    assert!(matches!(err, SmsError::InvalidArgument(_)));
}

// ---- Get and delete errors ----

#[tokio::test]
async fn get_unknown_id_is_not_found() {
    let (service, _dir) = common::create_test_service();
    let err = service.get_message("does-not-exist").await.unwrap_err();
    assert!(matches!(err, SmsError::MessageNotFound(_)));
    assert_eq!(err.code(), SmsErrorCode::NotFound);
}

#[tokio::test]
async fn get_blank_id_is_invalid_argument() {
    let (service, _dir) = common::create_test_service();
    let err = service.get_message("").await.unwrap_err();
    assert_eq!(err.code(), SmsErrorCode::InvalidArgument);
}

#[tokio::test]
async fn deleted_message_is_gone() {
    let (service, _dir) = common::create_test_service();
    let id = service.save_sent_message(ALICE, "bye", at(5)).await.unwrap();

    service.delete_message(&id).await.unwrap();

    assert!(service.get_message(&id).await.unwrap_err().is_not_found());
    assert!(service.delete_message(&id).await.unwrap_err().is_not_found());
    assert!(service.get_all_messages().await.unwrap().is_empty());
}

#[tokio::test]
async fn get_all_messages_is_in_timestamp_order() {
    let (service, _dir) = common::create_test_service();
    let late = service.save_sent_message(ALICE, "late", at(300)).await.unwrap();
    let early = service.save_sent_message(ALICE, "early", at(100)).await.unwrap();
    let middle = service.save_received_message(BOB, "middle", at(200)).await.unwrap();

    let ids: Vec<String> = service
        .get_all_messages()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![early, middle, late]);
}

// ---- Per-message handle ----

#[tokio::test]
async fn message_ref_fetch_update_remove() {
    let (service, _dir) = common::create_test_service();
    let id = service.save_sent_message(ALICE, "original", at(7)).await.unwrap();

    let message = service.message(id.clone());
    assert_eq!(message.id(), id);
    assert_eq!(message.fetch().await.unwrap().body, "original");

    let updated = message.update_body("edited").await.unwrap();
    assert_eq!(updated.id, id);
    assert_eq!(updated.body, "edited");
    assert_eq!(updated.timestamp, at(7));
    assert_eq!(service.get_message(&id).await.unwrap().body, "edited");

    message.remove().await.unwrap();
    assert!(message.fetch().await.unwrap_err().is_not_found());
    assert!(message.update_body("again").await.unwrap_err().is_not_found());
}

// ---- Lifecycle ----

#[tokio::test]
async fn service_lifecycle_opens_store_and_clears_lists() {
    let (mut service, _dir) = common::create_test_service();
    assert_eq!(service.state(), ServiceState::Created);
    assert_eq!(service.name(), "message_store");

    service.init().await.unwrap();
    assert!(service.is_healthy());

    common::seed_conversation(&service).await;
    let filter = sms_models::MessageFilter::new().with_delivery(Delivery::Sent);
    let (handle, _) = service.create_message_list(&filter, false).await.unwrap();
    assert_eq!(service.lists().len().await, 1);

    service.shutdown().await.unwrap();
    assert_eq!(service.state(), ServiceState::Stopped);
    assert!(service.lists().is_empty().await);
    assert!(matches!(
        service.get_next_message_in_list(&handle).await.unwrap_err(),
        SmsError::InvalidHandle(_)
    ));
}

#[tokio::test]
async fn service_from_config_uses_configured_database_and_address() {
    let dir = TempDir::new().unwrap();
    let config = common::create_test_config(&dir);

    let mut service = MessageStoreService::from_config(&config).unwrap();
    assert_eq!(service.own_address(), OWN_ADDRESS);
    service.init().await.unwrap();

    let id = service.save_sent_message(ALICE, "from config", at(1)).await.unwrap();
    assert!(dir.path().join("config.db").exists());

    // A second service on the same file sees the message.
    let other = MessageStoreService::from_config(&config).unwrap();
    assert_eq!(other.get_message(&id).await.unwrap().body, "from config");
}
