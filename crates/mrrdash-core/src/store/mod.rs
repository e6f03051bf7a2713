//! Key-value persistence for the session token.
//!
//! The session manager only ever needs string get/set/remove on three keys,
//! so every back-end implements the small `KeyValueStore` trait:
//!
//! - `MemoryStore`: process-local map, for tests and throwaway sessions
//! - `FileStore`: a JSON object in the cache directory
//! - `KeyringStore`: one OS keychain entry per key

pub mod file;
pub mod keyring;
pub mod memory;

use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::config::{Config, StoreBackend};

pub use file::FileStore;
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] ::keyring::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removing a key that is not present succeeds
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Open the back-end selected in `config`
pub fn open(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    Ok(match config.store {
        StoreBackend::File => Arc::new(FileStore::in_dir(&Config::cache_dir()?)),
        StoreBackend::Keyring => Arc::new(KeyringStore::new()),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    })
}
