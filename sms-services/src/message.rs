//! Message store service.
//!
//! Saves, fetches and deletes SMS messages and exposes filtered queries as
//! message lists that callers page through one message at a time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use sms_core::config::AppConfig;
use sms_core::error::{SmsError, SmsResult};
use sms_models::{
    Delivery, IndexName, KeyRange, Message, MessageFilter, MessageRecord, RecordStore, ScopeMode,
    SortDirection, SqliteStore,
};

use crate::message_list::MessageListManager;
use crate::query::QueryEngine;
use crate::service::{Service, ServiceState};

/// Service owning the record store and the live message lists.
///
/// Construct one per store and pass it to whoever needs it. Every operation
/// is a single request that either completes or fails as a whole; store
/// failures abort the operation without partial writes or results.
pub struct MessageStoreService {
    state: ServiceState,
    store: Arc<dyn RecordStore>,
    engine: QueryEngine,
    lists: MessageListManager,
    own_address: String,
}

impl MessageStoreService {
    /// Create a service on top of `store`. `own_address` is this device's
    /// address, recorded as the sender of sent messages and the receiver of
    /// received ones.
    pub fn new(store: Arc<dyn RecordStore>, own_address: impl Into<String>) -> Self {
        Self {
            state: ServiceState::Created,
            engine: QueryEngine::new(Arc::clone(&store)),
            store,
            lists: MessageListManager::new(),
            own_address: own_address.into(),
        }
    }

    /// Create a service backed by the SQLite database the configuration
    /// points at. The database is opened on `init` or first use.
    pub fn from_config(config: &AppConfig) -> SmsResult<Self> {
        let path = config.effective_db_path()?;
        let store = SqliteStore::new(path, config.database.clone());
        Ok(Self::new(Arc::new(store), config.sms.own_address.clone()))
    }

    pub fn own_address(&self) -> &str {
        &self.own_address
    }

    /// The live message lists.
    pub fn lists(&self) -> &MessageListManager {
        &self.lists
    }

    // ---- Saving ----

    /// Save a message this device sent to `receiver`.
    pub async fn save_sent_message(
        &self,
        receiver: &str,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> SmsResult<String> {
        let own = self.require_own_address()?;
        require_address(receiver, "receiver")?;
        let record = MessageRecord::from_wire_fields(Delivery::Sent, own, receiver, body, timestamp);
        self.save_message(record).await
    }

    /// Save a message this device received from `sender`.
    pub async fn save_received_message(
        &self,
        sender: &str,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> SmsResult<String> {
        let own = self.require_own_address()?;
        require_address(sender, "sender")?;
        let record = MessageRecord::from_wire_fields(Delivery::Received, sender, own, body, timestamp);
        self.save_message(record).await
    }

    /// Insert or replace a record and return its identifier.
    ///
    /// A record without an identifier gets a fresh one. A record that
    /// already has one keeps it, so saving it again updates it in place.
    pub async fn save_message(&self, mut record: MessageRecord) -> SmsResult<String> {
        let id = record.assign_identifier_on_first_save().to_string();
        let scope = self.store.begin(ScopeMode::ReadWrite).await?;
        scope.put(&record).await?;
        scope.commit().await?;
        debug!("saved {} message {id}", record.delivery);
        Ok(id)
    }

    // ---- Single records ----

    pub async fn get_message(&self, id: &str) -> SmsResult<Message> {
        require_id(id)?;
        let scope = self.store.begin(ScopeMode::ReadOnly).await?;
        let record = scope.get(id).await?;
        scope.commit().await?;
        record
            .ok_or_else(|| SmsError::MessageNotFound(id.to_string()))?
            .to_wire_message()
    }

    pub async fn delete_message(&self, id: &str) -> SmsResult<()> {
        require_id(id)?;
        let scope = self.store.begin(ScopeMode::ReadWrite).await?;
        if !scope.delete(id).await? {
            // Dropping the scope rolls it back.
            return Err(SmsError::MessageNotFound(id.to_string()));
        }
        scope.commit().await?;
        debug!("deleted message {id}");
        Ok(())
    }

    /// Every stored message, oldest first.
    pub async fn get_all_messages(&self) -> SmsResult<Vec<Message>> {
        let scope = self.store.begin(ScopeMode::ReadOnly).await?;
        let entries = scope
            .scan_index(IndexName::Timestamp, KeyRange::all(), SortDirection::Asc)
            .await?;

        let mut messages = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(record) = scope.get(&entry.primary_key).await? {
                messages.push(record.to_wire_message()?);
            }
        }
        scope.commit().await?;
        Ok(messages)
    }

    /// A handle for operating on one stored message.
    pub fn message(&self, id: impl Into<String>) -> MessageRef<'_> {
        MessageRef {
            service: self,
            id: id.into(),
        }
    }

    // ---- Message lists ----

    /// Run `filter` and register the matching identifiers as a new list.
    ///
    /// Returns the list's handle together with its first message, which is
    /// consumed from the list. An empty result yields a valid, already
    /// exhausted list and no message.
    pub async fn create_message_list(
        &self,
        filter: &MessageFilter,
        reverse: bool,
    ) -> SmsResult<(String, Option<Message>)> {
        let keys = self.engine.execute(filter, reverse).await?;
        let handle = self.lists.register(keys).await;
        let first = match self.get_next_message_in_list(&handle).await {
            Ok(first) => first,
            Err(e) => {
                // The caller never sees this handle.
                self.lists.dispose(&handle).await?;
                return Err(e);
            }
        };
        info!("created message list {handle}");
        Ok((handle, first))
    }

    /// Next message of a list, or `None` once the list is exhausted.
    ///
    /// Messages deleted after the list was created are skipped. A key is
    /// consumed only once its record has been read, so a failed call leaves
    /// the list unchanged and can be retried.
    pub async fn get_next_message_in_list(&self, handle: &str) -> SmsResult<Option<Message>> {
        while let Some(id) = self.lists.peek(handle).await? {
            let scope = self.store.begin(ScopeMode::ReadOnly).await?;
            let record = scope.get(&id).await?;
            scope.commit().await?;
            let message = record.as_ref().map(MessageRecord::to_wire_message).transpose()?;

            self.lists.next(handle).await?;
            match message {
                Some(message) => return Ok(Some(message)),
                None => warn!("message {id} in list {handle} no longer exists, skipping"),
            }
        }
        Ok(None)
    }

    /// Dispose of a list. Its handle becomes invalid.
    pub async fn clear_message_list(&self, handle: &str) -> SmsResult<()> {
        self.lists.dispose(handle).await
    }

    /// All messages matching `filter`, in list order.
    ///
    /// Without criteria this is `get_all_messages`, so the result is in
    /// timestamp order rather than identifier order.
    pub async fn get_messages(&self, filter: &MessageFilter, reverse: bool) -> SmsResult<Vec<Message>> {
        if filter.is_empty() {
            filter.validate()?;
            let mut messages = self.get_all_messages().await?;
            if reverse {
                messages.reverse();
            }
            return Ok(messages);
        }

        let (handle, first) = self.create_message_list(filter, reverse).await?;
        let mut messages: Vec<Message> = first.into_iter().collect();
        let drained = async {
            while let Some(message) = self.get_next_message_in_list(&handle).await? {
                messages.push(message);
            }
            Ok::<_, SmsError>(())
        }
        .await;
        self.clear_message_list(&handle).await?;
        drained?;
        Ok(messages)
    }

    fn require_own_address(&self) -> SmsResult<&str> {
        if self.own_address.trim().is_empty() {
            return Err(SmsError::InvalidArgument("own address is not configured".into()));
        }
        Ok(&self.own_address)
    }
}

fn require_id(id: &str) -> SmsResult<()> {
    if id.trim().is_empty() {
        return Err(SmsError::InvalidArgument("message id is empty".into()));
    }
    Ok(())
}

fn require_address(address: &str, field: &str) -> SmsResult<()> {
    if address.trim().is_empty() {
        return Err(SmsError::InvalidArgument(format!("{field} address is empty")));
    }
    Ok(())
}

#[async_trait]
impl Service for MessageStoreService {
    fn name(&self) -> &str {
        "message_store"
    }

    fn state(&self) -> ServiceState {
        self.state
    }

    async fn init(&mut self) -> SmsResult<()> {
        self.state = ServiceState::Initializing;
        if let Err(e) = self.store.open().await {
            self.state = ServiceState::Failed;
            return Err(e);
        }
        self.state = ServiceState::Running;
        info!("message store service initialized");
        Ok(())
    }

    async fn shutdown(&mut self) -> SmsResult<()> {
        self.state = ServiceState::ShuttingDown;
        self.lists.clear_all().await;
        self.state = ServiceState::Stopped;
        info!("message store service stopped");
        Ok(())
    }
}

/// One stored message, addressed by identifier.
pub struct MessageRef<'a> {
    service: &'a MessageStoreService,
    id: String,
}

impl MessageRef<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Load the current state of the message.
    pub async fn fetch(&self) -> SmsResult<Message> {
        self.service.get_message(&self.id).await
    }

    /// Delete the message.
    pub async fn remove(&self) -> SmsResult<()> {
        self.service.delete_message(&self.id).await
    }

    /// Replace the body and return the updated message. The identifier and
    /// every other field are kept.
    pub async fn update_body(&self, body: &str) -> SmsResult<Message> {
        require_id(&self.id)?;
        let scope = self.service.store.begin(ScopeMode::ReadWrite).await?;
        let mut record = scope
            .get(&self.id)
            .await?
            .ok_or_else(|| SmsError::MessageNotFound(self.id.clone()))?;
        record.body = body.to_string();
        scope.put(&record).await?;
        scope.commit().await?;
        debug!("updated body of message {}", self.id);
        record.to_wire_message()
    }
}
