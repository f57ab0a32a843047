//! Storage backends
//!
//! The single-flight layer only needs the [`CacheBackend`] contract below. An
//! in-memory reference implementation lives in [`memory`]; remote stores plug
//! in by implementing the same trait.

pub mod entry;
pub mod memory;

pub use entry::CacheEntry;
pub use memory::{start_auto_cleanup, BackendStats, MemoryBackend, MemoryBackendConfig};

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// Key-value store with expiry
///
/// Implementations must be safe to share between tasks. `flush` is global:
/// it clears every namespace and every tenant, not just the caller's group.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a value. `None` for absent and expired entries.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;

    /// Remove one entry, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every entry
    async fn flush(&self) -> Result<()>;

    /// Whether the store is reachable. When false callers skip it entirely.
    fn available(&self) -> bool;
}
