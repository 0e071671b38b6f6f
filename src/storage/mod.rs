//! Durable key/value storage for delivery state.
//!
//! Two kinds of keys live in the store:
//!
//! ```text
//! channel-cursor-{channel}   -> "1234"          # last delivered message id
//! {cache_prefix}-{thread_id} -> "{key}"         # thread already delivered
//! ```
//!
//! Backends offer plain `read`/`write` without transactions or expiry.
//! [`CursorStore`] and [`DeliveryCache`] add the feed semantics on top.

mod cursor;
pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;

// Re-export for convenience
pub use cursor::{CursorStore, DeliveryCache};
pub use local::LocalStorage;

/// Trait for key/value storage backends.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value, `None` when the key was never written.
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
