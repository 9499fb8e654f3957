//! Key-value storage port
//!
//! The persistence boundary: a string key-value store offering plain reads,
//! atomic read-modify-write transactions, and push-based observation of a
//! key's value. [`FileKvStore`] persists the whole map as one JSON file
//! under the data directory; [`MemoryKvStore`] keeps the same contract in
//! memory for tests and ephemeral use.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{watch, Mutex};

use crate::storage::StorageError;

/// Closure applied to a key's current value inside a transaction.
///
/// Receives the current value (`None` when the key is absent) and returns
/// the value to commit (`None` removes the key). Returning an error aborts
/// the transaction: nothing is written and observers are not notified.
pub type Update = Box<dyn FnOnce(Option<String>) -> Result<Option<String>, StorageError> + Send>;

/// Durable string key-value entries with serialized read-modify-write
/// transactions and observable values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the current value of `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Atomically read `key`, apply `update`, and commit the result.
    ///
    /// Transactions on one store never interleave; concurrent callers are
    /// serialized. Observers of `key` see the committed value.
    async fn transact(&self, key: &str, update: Update) -> Result<(), StorageError>;

    /// Observe `key`. The receiver holds the value as of subscription and
    /// is updated after every committed transaction on the key. Dropping
    /// the receiver unsubscribes.
    async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<String>>, StorageError>;
}

/// File-backed store keeping the whole key-value map in one JSON file.
///
/// Writes land in a temp file that is renamed over the target, so a crash
/// never leaves a half-written map behind. A missing or unparseable file
/// reads as an empty map.
pub struct FileKvStore {
    path: PathBuf,
    lock: Mutex<()>,
    watchers: DashMap<String, watch::Sender<Option<String>>>,
}

impl FileKvStore {
    /// Create a store persisting to `path`. The file appears on the first
    /// committed transaction.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            watchers: DashMap::new(),
        }
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(map) => Ok(map),
            Err(e) => {
                tracing::warn!("Unreadable store file {:?}, treating as empty: {}", self.path, e);
                Ok(BTreeMap::new())
            }
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn notify(&self, key: &str, value: Option<String>) {
        if let Some(sender) = self.watchers.get(key) {
            sender.send_replace(value);
        }
    }
}

#[async_trait]
impl KeyValueStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.get(key).cloned())
    }

    async fn transact(&self, key: &str, update: Update) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        let next = update(map.get(key).cloned())?;
        match &next {
            Some(value) => {
                map.insert(key.to_string(), value.clone());
            }
            None => {
                map.remove(key);
            }
        }
        self.write_map(&map).await?;
        self.notify(key, next);
        tracing::debug!("Committed transaction on key '{}'", key);
        Ok(())
    }

    async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<String>>, StorageError> {
        // The channel is created and primed under the transaction lock so a
        // concurrent commit can neither be missed nor observed stale.
        let _guard = self.lock.lock().await;
        let current = self.read_map().await?.get(key).cloned();
        let sender = self
            .watchers
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(current).0);
        Ok(sender.subscribe())
    }
}

/// In-memory store with the same transactional contract as [`FileKvStore`].
/// Nothing survives the process.
#[derive(Default)]
pub struct MemoryKvStore {
    data: Mutex<BTreeMap<String, String>>,
    watchers: DashMap<String, watch::Sender<Option<String>>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn transact(&self, key: &str, update: Update) -> Result<(), StorageError> {
        let mut data = self.data.lock().await;
        let next = update(data.get(key).cloned())?;
        match &next {
            Some(value) => {
                data.insert(key.to_string(), value.clone());
            }
            None => {
                data.remove(key);
            }
        }
        if let Some(sender) = self.watchers.get(key) {
            sender.send_replace(next);
        }
        Ok(())
    }

    async fn observe(&self, key: &str) -> Result<watch::Receiver<Option<String>>, StorageError> {
        let data = self.data.lock().await;
        let current = data.get(key).cloned();
        let sender = self
            .watchers
            .entry(key.to_string())
            .or_insert_with(|| watch::channel(current).0);
        Ok(sender.subscribe())
    }
}
