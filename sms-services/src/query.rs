//! Filtered message queries.
//!
//! A query runs one index scan per active criterion inside a single
//! read-only scope and intersects the results. The timestamp index always
//! supplies the order, so results come back oldest first (newest first when
//! reversed) with ties broken by identifier.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tracing::debug;

use sms_core::error::SmsResult;
use sms_models::{
    Delivery, IndexKey, IndexName, KeyRange, MessageFilter, RecordStore, ScanEntry, Scope,
    ScopeMode, SortDirection,
};

/// Turns a `MessageFilter` into an ordered, duplicate-free list of message
/// identifiers.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn RecordStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Run `filter` against the store.
    ///
    /// A filter with no active criterion returns every identifier in
    /// identifier order. Otherwise all active criteria must match. An empty
    /// result is not an error. Any scan failure fails the whole query.
    pub async fn execute(&self, filter: &MessageFilter, reverse: bool) -> SmsResult<Vec<String>> {
        filter.validate()?;

        let scope = self.store.begin(ScopeMode::ReadOnly).await?;

        if filter.is_empty() {
            let keys = scope.scan_all().await?;
            scope.commit().await?;
            debug!("query without criteria matched {} messages", keys.len());
            return Ok(keys);
        }

        let (ordered, by_delivery, by_number) = tokio::try_join!(
            ordering_scan(&*scope, filter, reverse),
            delivery_matches(&*scope, filter.delivery),
            number_matches(&*scope, filter.number_set()),
        )?;
        scope.commit().await?;

        let mut seen = HashSet::new();
        let keys: Vec<String> = ordered
            .into_iter()
            .map(|entry| entry.primary_key)
            .filter(|id| by_delivery.as_ref().map_or(true, |ids| ids.contains(id)))
            .filter(|id| by_number.as_ref().map_or(true, |ids| ids.contains(id)))
            .filter(|id| seen.insert(id.clone()))
            .collect();

        debug!(
            criteria = filter.active_criteria(),
            reverse,
            "query matched {} messages",
            keys.len()
        );
        Ok(keys)
    }
}

/// Timestamp index scan over the filter's time range, or the whole index
/// when the filter has none.
async fn ordering_scan(
    scope: &dyn Scope,
    filter: &MessageFilter,
    reverse: bool,
) -> SmsResult<Vec<ScanEntry>> {
    let range = match filter.active_time_range() {
        Some(range) => KeyRange::bound(
            range.start_millis().map(IndexKey::from),
            range.end_millis().map(IndexKey::from),
        ),
        None => KeyRange::all(),
    };
    scope
        .scan_index(IndexName::Timestamp, range, SortDirection::from_reverse(reverse))
        .await
}

async fn delivery_matches(
    scope: &dyn Scope,
    delivery: Option<Delivery>,
) -> SmsResult<Option<HashSet<String>>> {
    let Some(delivery) = delivery else {
        return Ok(None);
    };
    let entries = scope
        .scan_index(IndexName::Delivery, KeyRange::only(delivery.as_str()), SortDirection::Asc)
        .await?;
    Ok(Some(entries.into_iter().map(|e| e.primary_key).collect()))
}

/// Messages sent by or to any of `numbers`.
///
/// Both address indexes are scanned over the range spanning the smallest
/// and largest number. That range also covers addresses sorting between
/// the members, so entries are kept only when their key is in the set.
async fn number_matches(
    scope: &dyn Scope,
    numbers: Option<BTreeSet<&str>>,
) -> SmsResult<Option<HashSet<String>>> {
    let Some(numbers) = numbers else {
        return Ok(None);
    };
    let (Some(lowest), Some(highest)) = (numbers.first(), numbers.last()) else {
        return Ok(Some(HashSet::new()));
    };

    let range = KeyRange::bound(Some((*lowest).into()), Some((*highest).into()));
    let (senders, receivers) = tokio::try_join!(
        scope.scan_index(IndexName::Sender, range.clone(), SortDirection::Asc),
        scope.scan_index(IndexName::Receiver, range, SortDirection::Asc),
    )?;

    let ids = senders
        .into_iter()
        .chain(receivers)
        .filter(|entry| matches!(&entry.key, IndexKey::Text(address) if numbers.contains(address.as_str())))
        .map(|entry| entry.primary_key)
        .collect();
    Ok(Some(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sms_core::config::DatabaseConfig;
    use sms_models::{MessageRecord, SqliteStore};
    use tempfile::TempDir;

    async fn seeded_store() -> (Arc<SqliteStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteStore::new(dir.path().join("query.db"), DatabaseConfig::default()));

        let rows = [
            ("a", Delivery::Sent, "+1", "+2", 30),
            ("b", Delivery::Received, "+2", "+1", 10),
            ("c", Delivery::Sent, "+1", "+3", 20),
            ("d", Delivery::Received, "+4", "+1", 20),
        ];
        let scope = store.begin(ScopeMode::ReadWrite).await.unwrap();
        for (id, delivery, sender, receiver, ts) in rows {
            let mut record = MessageRecord::from_wire_fields(
                delivery,
                sender,
                receiver,
                "body",
                Utc.timestamp_millis_opt(ts).unwrap(),
            );
            record.id = Some(id.to_string());
            scope.put(&record).await.unwrap();
        }
        scope.commit().await.unwrap();
        (store, dir)
    }

    fn at(ms: i64) -> chrono::DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[tokio::test]
    async fn test_empty_filter_returns_all_in_id_order() {
        let (store, _dir) = seeded_store().await;
        let engine = QueryEngine::new(store);
        let keys = engine.execute(&MessageFilter::new(), true).await.unwrap();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_delivery_only_is_ordered_by_timestamp() {
        let (store, _dir) = seeded_store().await;
        let engine = QueryEngine::new(store);
        let filter = MessageFilter::new().with_delivery(Delivery::Sent);

        assert_eq!(engine.execute(&filter, false).await.unwrap(), vec!["c", "a"]);
        assert_eq!(engine.execute(&filter, true).await.unwrap(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_time_range_is_inclusive() {
        let (store, _dir) = seeded_store().await;
        let engine = QueryEngine::new(store);
        let filter = MessageFilter::new().between(at(10), at(20));
        assert_eq!(engine.execute(&filter, false).await.unwrap(), vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_numbers_exclude_addresses_inside_bounding_range() {
        let (store, _dir) = seeded_store().await;
        let engine = QueryEngine::new(store);
        // "+2" and "+3" sort between "+1" and "+4" but are not members.
        let filter = MessageFilter::new().with_numbers(["+4", "+1"]).with_delivery(Delivery::Sent);
        assert_eq!(engine.execute(&filter, false).await.unwrap(), vec!["c", "a"]);

        let filter = MessageFilter::new().with_numbers(["+2", "+4"]);
        assert_eq!(engine.execute(&filter, false).await.unwrap(), vec!["b", "d", "a"]);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_rejected() {
        let (store, _dir) = seeded_store().await;
        let engine = QueryEngine::new(store);
        let filter = MessageFilter::new().with_numbers(Vec::<String>::new());
        let err = engine.execute(&filter, false).await.unwrap_err();
        assert!(matches!(err, sms_core::SmsError::InvalidArgument(_)));
    }
}
