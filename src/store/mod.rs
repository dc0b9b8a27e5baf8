//! Persistent snapshot storage.
//!
//! # Data Flow
//! ```text
//! ServiceRegistry mutation
//!     → registry serializes the full map to JSON
//!     → SnapshotStore::set(key, bytes)
//!
//! Startup:
//!     SnapshotStore::get(key)
//!     → None: nothing to restore
//!     → Some(bytes): registry deserializes and merges by prefix
//! ```
//!
//! # Design Decisions
//! - The store is a best-effort durability aid, never the source of truth
//! - One fixed key holds the whole registry; every write replaces it
//! - Adapters must be safe for concurrent use

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::config::schema::{StoreBackend, StoreConfig};
use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Key-value contract the registry persists its snapshot through.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Read the value stored under `key`, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the value stored under `key`.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Release any connection held by the adapter.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Build the adapter selected in configuration.
pub fn from_config(config: &StoreConfig) -> Box<dyn SnapshotStore> {
    match config.backend {
        StoreBackend::Memory => Box::new(MemoryStore::new()),
        StoreBackend::File => Box::new(FileStore::new(&config.path)),
    }
}
