//! Persistent storage
//!
//! This module handles all data persistence: the key-value storage port,
//! its file-backed and in-memory adapters, and the scheme store built on
//! top of them.

pub mod kv;
pub mod schemes;

use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not determine a data directory for this platform")]
    DataDir,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Resolve the platform-specific data directory where persisted state lives.
pub fn get_data_dir() -> Result<PathBuf, StorageError> {
    ProjectDirs::from("com", "rangen", "rangen")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(StorageError::DataDir)
}
