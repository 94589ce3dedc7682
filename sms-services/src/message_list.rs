//! Registry of live message lists.
//!
//! A message list is the ordered result of a filtered query. Callers walk it
//! front to back through an opaque handle and dispose of it when done.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use sms_core::error::{SmsError, SmsResult};

/// Owns every live message list, keyed by handle.
#[derive(Clone, Default)]
pub struct MessageListManager {
    lists: Arc<Mutex<HashMap<String, VecDeque<String>>>>,
}

impl MessageListManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an ordered key sequence and return a fresh handle for it.
    pub async fn register(&self, keys: Vec<String>) -> String {
        let mut lists = self.lists.lock().await;
        let mut handle = Uuid::new_v4().to_string();
        while lists.contains_key(&handle) {
            handle = Uuid::new_v4().to_string();
        }
        debug!("registered message list {handle} with {} entries", keys.len());
        lists.insert(handle.clone(), keys.into());
        handle
    }

    /// Remove and return the front key. `None` once the list is exhausted;
    /// the list stays registered until disposed.
    pub async fn next(&self, handle: &str) -> SmsResult<Option<String>> {
        let mut lists = self.lists.lock().await;
        let list = lists
            .get_mut(handle)
            .ok_or_else(|| SmsError::InvalidHandle(handle.to_string()))?;
        Ok(list.pop_front())
    }

    /// The front key without consuming it. `None` once the list is exhausted.
    pub async fn peek(&self, handle: &str) -> SmsResult<Option<String>> {
        let lists = self.lists.lock().await;
        let list = lists
            .get(handle)
            .ok_or_else(|| SmsError::InvalidHandle(handle.to_string()))?;
        Ok(list.front().cloned())
    }

    /// Number of keys not yet consumed.
    pub async fn remaining(&self, handle: &str) -> SmsResult<usize> {
        let lists = self.lists.lock().await;
        lists
            .get(handle)
            .map(VecDeque::len)
            .ok_or_else(|| SmsError::InvalidHandle(handle.to_string()))
    }

    /// Destroy a list. Its handle is never valid again.
    pub async fn dispose(&self, handle: &str) -> SmsResult<()> {
        let mut lists = self.lists.lock().await;
        match lists.remove(handle) {
            Some(_) => {
                debug!("disposed message list {handle}");
                Ok(())
            }
            None => Err(SmsError::InvalidHandle(handle.to_string())),
        }
    }

    /// Destroy every live list.
    pub async fn clear_all(&self) {
        let mut lists = self.lists.lock().await;
        let count = lists.len();
        lists.clear();
        if count > 0 {
            info!("cleared {count} message lists");
        }
    }

    /// Number of live lists.
    pub async fn len(&self) -> usize {
        self.lists.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lists.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_next_walks_front_to_back() {
        let manager = MessageListManager::new();
        let handle = manager.register(keys(&["a", "b", "c"])).await;

        assert_eq!(manager.remaining(&handle).await.unwrap(), 3);
        assert_eq!(manager.next(&handle).await.unwrap().as_deref(), Some("a"));
        assert_eq!(manager.next(&handle).await.unwrap().as_deref(), Some("b"));
        assert_eq!(manager.remaining(&handle).await.unwrap(), 1);
        assert_eq!(manager.next(&handle).await.unwrap().as_deref(), Some("c"));
        assert_eq!(manager.next(&handle).await.unwrap(), None);
        // Exhausted lists stay registered.
        assert_eq!(manager.next(&handle).await.unwrap(), None);
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let manager = MessageListManager::new();
        let handle = manager.register(keys(&["a", "b"])).await;

        assert_eq!(manager.peek(&handle).await.unwrap().as_deref(), Some("a"));
        assert_eq!(manager.peek(&handle).await.unwrap().as_deref(), Some("a"));
        assert_eq!(manager.remaining(&handle).await.unwrap(), 2);

        manager.next(&handle).await.unwrap();
        manager.next(&handle).await.unwrap();
        assert_eq!(manager.peek(&handle).await.unwrap(), None);
        manager.dispose(&handle).await.unwrap();
        assert!(matches!(
            manager.peek(&handle).await.unwrap_err(),
            SmsError::InvalidHandle(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_list_is_exhausted_immediately() {
        let manager = MessageListManager::new();
        let handle = manager.register(Vec::new()).await;
        assert_eq!(manager.next(&handle).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_disposed_handle_is_invalid() {
        let manager = MessageListManager::new();
        let handle = manager.register(keys(&["a"])).await;
        manager.dispose(&handle).await.unwrap();

        let err = manager.next(&handle).await.unwrap_err();
        assert!(matches!(err, SmsError::InvalidHandle(_)));
        assert!(matches!(
            manager.dispose(&handle).await.unwrap_err(),
            SmsError::InvalidHandle(_)
        ));
        assert!(manager.remaining(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_handle_is_invalid() {
        let manager = MessageListManager::new();
        let err = manager.next("no-such-list").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_handles_are_unique_and_independent() {
        let manager = MessageListManager::new();
        let first = manager.register(keys(&["a", "b"])).await;
        let second = manager.register(keys(&["x"])).await;
        assert_ne!(first, second);

        assert_eq!(manager.next(&second).await.unwrap().as_deref(), Some("x"));
        assert_eq!(manager.next(&first).await.unwrap().as_deref(), Some("a"));
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let manager = MessageListManager::new();
        let handle = manager.register(keys(&["a"])).await;
        manager.register(keys(&["b"])).await;

        manager.clear_all().await;
        assert!(manager.is_empty().await);
        assert!(manager.next(&handle).await.is_err());
    }
}
