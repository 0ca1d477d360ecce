//! Disposable key-value mirror of the task store.
//!
//! ```text
//! TaskCache<C: CacheStore>   <- typed keys, JSON values, corruption handling
//!   └── CacheStore (trait)   <- raw string key-value collaborator
//!         ├── MemoryCache    <- ordered in-process map
//!         └── NoOpCache      <- always miss, always succeed
//! ```
//!
//! The cache is never the source of truth. Every error is returned to the
//! caller as a [`CacheError`] and the service falls back to the store.

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod tasks;

pub use memory::{MemoryCache, NoOpCache};
pub use tasks::TaskCache;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache value could not be serialized")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Raw string key-value store.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;
    /// Stores `value` under `key` with no expiry.
    async fn set(&self, key: &str, value: String) -> CacheResult<()>;
    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
    /// Every entry whose key starts with `prefix`, in key order.
    async fn scan_prefix(&self, prefix: &str) -> CacheResult<Vec<(String, String)>>;
    /// Deletes every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> CacheResult<usize>;
}
