//! Local filesystem storage implementation.
//!
//! All keys live in one JSON object so the state can be inspected and edited
//! by hand. Every write persists the whole map atomically.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml           # Relay configuration
//! └── state.json            # Cursors and delivery flags
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::KvStore;

const STATE_FILE: &str = "state.json";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl LocalStorage {
    /// Open the store rooted at `root_dir`, loading existing state if any.
    pub async fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let root_dir = root_dir.into();
        let entries = match tokio::fs::read(root_dir.join(STATE_FILE)).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(AppError::Io(e)),
        };

        Ok(Self {
            root_dir,
            entries: Mutex::new(entries),
        })
    }

    /// Path of the state file.
    pub fn state_path(&self) -> PathBuf {
        self.root_dir.join(STATE_FILE)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for LocalStorage {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        // Held across the file write so concurrent feeds persist in order.
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value.to_string());

        let bytes = serde_json::to_vec_pretty(&*entries)?;
        Self::write_bytes(&self.state_path(), &bytes).await
    }
}
