//! In-memory reference backend with TTL expiry and LRU eviction

use crate::backend::{entry::CacheEntry, CacheBackend};
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration for the in-memory backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBackendConfig {
    /// Maximum number of entries before LRU eviction kicks in
    pub max_entries: usize,

    /// Interval for the background expiry sweep
    pub cleanup_interval: Duration,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

/// Counters kept by [`MemoryBackend`]
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Reads that found a live entry
    pub hits: u64,

    /// Reads that found nothing or an expired entry
    pub misses: u64,

    /// Number of entries currently stored
    pub entries: usize,

    /// Evictions due to `max_entries`
    pub evictions_size: u64,

    /// Entries dropped because their TTL ran out
    pub evictions_ttl: u64,

    /// Explicit deletes that removed an entry
    pub deletes: u64,

    /// Completed flushes
    pub flushes: u64,
}

impl fmt::Display for BackendStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BackendStats {{ hits: {}, misses: {}, entries: {}, evictions: {}, flushes: {} }}",
            self.hits,
            self.misses,
            self.entries,
            self.evictions_size + self.evictions_ttl,
            self.flushes
        )
    }
}

/// Process-local backend
///
/// - Thread-safe async access via RwLock
/// - Lazy TTL expiry on read plus an optional background sweep
/// - LRU eviction once `max_entries` is reached
/// - Can be switched offline to exercise the unavailable-backend path
pub struct MemoryBackend {
    config: MemoryBackendConfig,
    store: RwLock<Store>,
    available: AtomicBool,
}

struct Store {
    entries: HashMap<String, CacheEntry>,
    /// Access order, least recent at the front
    lru_queue: VecDeque<String>,
    stats: BackendStats,
}

impl MemoryBackend {
    /// Create a new backend with the given configuration
    pub fn new(config: MemoryBackendConfig) -> Self {
        info!("Initializing memory cache backend with config: {:?}", config);

        Self {
            config,
            store: RwLock::new(Store {
                entries: HashMap::new(),
                lru_queue: VecDeque::new(),
                stats: BackendStats::default(),
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Backend with default configuration
    pub fn with_defaults() -> Self {
        Self::new(MemoryBackendConfig::default())
    }

    pub fn config(&self) -> &MemoryBackendConfig {
        &self.config
    }

    /// Simulate connecting or disconnecting the store
    pub fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::SeqCst);
        if previous != available {
            info!("Memory cache backend available: {}", available);
        }
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut store = self.store.write().await;
        let now = chrono::Utc::now();

        let expired: Vec<String> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            store.remove(key);
        }
        store.stats.evictions_ttl += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }
        expired.len()
    }

    /// Get backend statistics
    pub async fn stats(&self) -> BackendStats {
        let store = self.store.read().await;
        let mut stats = store.stats.clone();
        stats.entries = store.entries.len();
        stats
    }

    /// Get number of stored entries, expired ones included until swept
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    /// Check if the backend holds no entries
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available() {
            Ok(())
        } else {
            Err(CacheError::BackendUnavailable(
                "memory backend is offline".to_string(),
            ))
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Store {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        Some(entry)
    }

    fn touch(&mut self, key: &str) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.to_string());
    }

    fn evict_for_insert(&mut self, max_entries: usize) {
        while self.entries.len() >= max_entries {
            match self.lru_queue.pop_front() {
                Some(key) => {
                    debug!("Evicting entry due to max_entries limit: {}", key);
                    self.entries.remove(&key);
                    self.stats.evictions_size += 1;
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.ensure_available()?;
        let mut guard = self.store.write().await;
        let store = &mut *guard;

        let expired = match store.entries.get_mut(key) {
            Some(entry) if !entry.is_expired() => {
                entry.mark_accessed();
                let value = entry.value.clone();
                store.stats.hits += 1;
                store.touch(key);
                return Ok(Some(value));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            store.remove(key);
            store.stats.evictions_ttl += 1;
        }
        store.stats.misses += 1;
        Ok(None)
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        self.ensure_available()?;
        let mut store = self.store.write().await;

        let entry = CacheEntry::new(value, ttl);
        if store.entries.contains_key(key) {
            store.entries.insert(key.to_string(), entry);
        } else {
            store.evict_for_insert(self.config.max_entries);
            store.entries.insert(key.to_string(), entry);
        }
        store.touch(key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.ensure_available()?;
        let mut store = self.store.write().await;

        let removed = store.remove(key).is_some();
        if removed {
            store.stats.deletes += 1;
            debug!("Removed cache entry: {}", key);
        }
        Ok(removed)
    }

    async fn flush(&self) -> Result<()> {
        self.ensure_available()?;
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.stats.flushes += 1;

        info!("Flushed {} entries from memory backend", count);
        Ok(())
    }

    fn available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// Background task sweeping expired entries every `cleanup_interval`
pub async fn start_auto_cleanup(backend: Arc<MemoryBackend>) {
    let interval = backend.config.cleanup_interval;

    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    loop {
        tokio::time::sleep(interval).await;

        if !backend.available() {
            warn!("Skipping cache cleanup, backend offline");
            continue;
        }
        let removed = backend.cleanup_expired().await;
        if removed > 0 {
            debug!("Auto cleanup removed {} entries", removed);
        }
    }
}
