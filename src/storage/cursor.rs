//! Feed cursors and per-item delivery flags.

use crate::error::Result;
use crate::storage::KvStore;

/// Last delivered item id per channel.
pub struct CursorStore<'a> {
    store: &'a dyn KvStore,
}

impl<'a> CursorStore<'a> {
    pub fn new(store: &'a dyn KvStore) -> Self {
        Self { store }
    }

    fn key(feed_id: &str) -> String {
        format!("channel-cursor-{feed_id}")
    }

    /// Current cursor, `None` when the feed never delivered anything.
    ///
    /// A value that does not parse as an id is treated as absent.
    pub async fn load(&self, feed_id: &str) -> Result<Option<u64>> {
        let Some(raw) = self.store.read(&Self::key(feed_id)).await? else {
            return Ok(None);
        };
        match raw.trim().parse() {
            Ok(id) => Ok(Some(id)),
            Err(_) => {
                log::warn!("Ignoring unparseable cursor for {}: {:?}", feed_id, raw);
                Ok(None)
            }
        }
    }

    /// Move the cursor forward to `item_id`. Never moves it backwards.
    ///
    /// Returns whether a write happened.
    pub async fn commit(&self, feed_id: &str, item_id: u64) -> Result<bool> {
        if let Some(current) = self.load(feed_id).await? {
            if item_id <= current {
                log::debug!(
                    "Cursor for {} stays at {} (offered {})",
                    feed_id,
                    current,
                    item_id
                );
                return Ok(false);
            }
        }
        self.store
            .write(&Self::key(feed_id), &item_id.to_string())
            .await?;
        Ok(true)
    }

    /// Overwrite the cursor unconditionally (operator reset).
    pub async fn reset(&self, feed_id: &str, item_id: u64) -> Result<()> {
        self.store
            .write(&Self::key(feed_id), &item_id.to_string())
            .await
    }
}

/// Per-item "already delivered" flags for feeds without a usable cursor.
pub struct DeliveryCache<'a> {
    store: &'a dyn KvStore,
    prefix: &'a str,
}

impl<'a> DeliveryCache<'a> {
    pub fn new(store: &'a dyn KvStore, prefix: &'a str) -> Self {
        Self { store, prefix }
    }

    pub fn key(&self, item_id: u64) -> String {
        format!("{}-{}", self.prefix, item_id)
    }

    /// Whether the item was delivered before. Lookup errors count as "no".
    pub async fn is_delivered(&self, item_id: u64) -> bool {
        let key = self.key(item_id);
        match self.store.read(&key).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                log::warn!("Delivery flag lookup failed for {}: {}", key, e);
                false
            }
        }
    }

    pub async fn mark_delivered(&self, item_id: u64) -> Result<()> {
        let key = self.key(item_id);
        self.store.write(&key, &key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn read(&self, _key: &str) -> Result<Option<String>> {
            Err(AppError::Storage("unreachable".into()))
        }

        async fn write(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AppError::Storage("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_cursor_absent_then_committed() {
        let store = MemoryStore::new();
        let cursors = CursorStore::new(&store);

        assert_eq!(cursors.load("news").await.unwrap(), None);
        assert!(cursors.commit("news", 42).await.unwrap());
        assert_eq!(cursors.load("news").await.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_cursor_never_moves_backwards() {
        let store = MemoryStore::new();
        let cursors = CursorStore::new(&store);

        cursors.commit("news", 42).await.unwrap();
        assert!(!cursors.commit("news", 40).await.unwrap());
        assert_eq!(cursors.load("news").await.unwrap(), Some(42));

        cursors.reset("news", 7).await.unwrap();
        assert_eq!(cursors.load("news").await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn test_garbage_cursor_is_absent() {
        let store = MemoryStore::new();
        store.write("channel-cursor-news", "oops").await.unwrap();
        assert_eq!(CursorStore::new(&store).load("news").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delivery_flags() {
        let store = MemoryStore::new();
        let cache = DeliveryCache::new(&store, "forum-threads");

        assert!(!cache.is_delivered(9).await);
        cache.mark_delivered(9).await.unwrap();
        assert!(cache.is_delivered(9).await);
        assert_eq!(
            store.read("forum-threads-9").await.unwrap().as_deref(),
            Some("forum-threads-9")
        );
    }

    #[tokio::test]
    async fn test_lookup_error_means_not_delivered() {
        let cache = DeliveryCache::new(&BrokenStore, "forum-threads");
        assert!(!cache.is_delivered(1).await);
    }
}
