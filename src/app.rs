//! Application wiring
//!
//! Builds the storage stack the presentation layer talks to: a file-backed
//! key-value store under the platform data directory, with the scheme
//! repository on top.

use std::path::PathBuf;
use std::sync::Arc;

use crate::storage::kv::FileKvStore;
use crate::storage::schemes::SchemeStore;
use crate::storage::{get_data_dir, StorageError};

/// Name of the key-value map file under the data directory.
const STORE_FILE: &str = "schemes.json";

/// Application state shared across the presentation layer
#[derive(Clone)]
pub struct App {
    pub schemes: SchemeStore,
}

impl App {
    /// Wire the application against the platform data directory.
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_data_dir(get_data_dir()?))
    }

    /// Wire the application against an explicit data directory.
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        let path = dir.into().join(STORE_FILE);
        tracing::info!("Using scheme store at {:?}", path);
        let kv = Arc::new(FileKvStore::new(path));
        Self {
            schemes: SchemeStore::new(kv),
        }
    }
}
