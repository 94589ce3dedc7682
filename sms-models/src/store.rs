//! The indexed record store consumed by the service layer.
//!
//! A `RecordStore` hands out `Scope`s. Every call made through one scope
//! sees the same snapshot, and the scope's writes become visible only when
//! it commits. Dropping a scope without committing discards its writes.

use async_trait::async_trait;
use sms_core::error::SmsResult;

use crate::models::message::MessageRecord;

/// Access mode of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    ReadOnly,
    /// Exclusive with respect to other read-write scopes.
    ReadWrite,
}

/// Secondary indexes over the message collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    Id,
    Delivery,
    Sender,
    Receiver,
    Timestamp,
}

impl IndexName {
    /// The indexed column.
    pub fn column(&self) -> &'static str {
        match self {
            IndexName::Id => "id",
            IndexName::Delivery => "delivery",
            IndexName::Sender => "sender",
            IndexName::Receiver => "receiver",
            IndexName::Timestamp => "timestamp",
        }
    }
}

impl std::fmt::Display for IndexName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Value of an indexed field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    Text(String),
    Integer(i64),
}

impl From<&str> for IndexKey {
    fn from(value: &str) -> Self {
        IndexKey::Text(value.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(value: String) -> Self {
        IndexKey::Text(value)
    }
}

impl From<i64> for IndexKey {
    fn from(value: i64) -> Self {
        IndexKey::Integer(value)
    }
}

/// Range of index keys to scan. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    Only(IndexKey),
    Bound {
        lower: Option<IndexKey>,
        upper: Option<IndexKey>,
    },
}

impl KeyRange {
    pub fn only(key: impl Into<IndexKey>) -> Self {
        KeyRange::Only(key.into())
    }

    pub fn bound(lower: Option<IndexKey>, upper: Option<IndexKey>) -> Self {
        KeyRange::Bound { lower, upper }
    }

    /// Every key in the index.
    pub fn all() -> Self {
        KeyRange::Bound { lower: None, upper: None }
    }
}

/// Sort direction for index scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One step of an index cursor: the indexed value and the record's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub key: IndexKey,
    pub primary_key: String,
}

/// A persisted, indexed message store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Make the store ready for use. Idempotent; the first success is cached.
    async fn open(&self) -> SmsResult<()>;

    /// Start a scope. Opens the store first if needed.
    async fn begin(&self, mode: ScopeMode) -> SmsResult<Box<dyn Scope>>;
}

/// A transaction over the message collection.
#[async_trait]
pub trait Scope: Send + Sync {
    fn mode(&self) -> ScopeMode;

    async fn get(&self, id: &str) -> SmsResult<Option<MessageRecord>>;

    /// Insert or replace a record. The record must already carry an identifier.
    async fn put(&self, record: &MessageRecord) -> SmsResult<()>;

    /// Returns false if no record was stored under `id`.
    async fn delete(&self, id: &str) -> SmsResult<bool>;

    /// Keys of the records whose indexed field lies in `range`, ordered by
    /// index key and then primary key.
    async fn scan_index(
        &self,
        index: IndexName,
        range: KeyRange,
        direction: SortDirection,
    ) -> SmsResult<Vec<ScanEntry>>;

    /// All primary keys, in primary key order.
    async fn scan_all(&self) -> SmsResult<Vec<String>>;

    async fn commit(self: Box<Self>) -> SmsResult<()>;
}
