//! Shared helpers for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use ouroboros_cache::{CacheBackend, CacheError, CacheFacade, MemoryBackend, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Memory backend wrapper that can be told to fail individual operations
#[derive(Default)]
pub struct FlakyBackend {
    pub inner: MemoryBackend,
    pub fail_get: AtomicBool,
    pub fail_set: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_flush: AtomicBool,
    pub panic_on_flush: AtomicBool,
    /// TTL passed to the most recent successful `set`
    pub last_ttl: Mutex<Option<Duration>>,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    pub fn last_ttl(&self) -> Option<Duration> {
        *self.last_ttl.lock().unwrap()
    }
}

#[async_trait]
impl CacheBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(CacheError::BackendError("read timed out".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        if self.fail_set.load(Ordering::SeqCst) {
            return Err(CacheError::BackendError("out of memory".to_string()));
        }
        self.inner.set(key, value, ttl).await?;
        *self.last_ttl.lock().unwrap() = Some(ttl);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(CacheError::BackendError("connection reset".to_string()));
        }
        self.inner.delete(key).await
    }

    async fn flush(&self) -> Result<()> {
        if self.panic_on_flush.load(Ordering::SeqCst) {
            panic!("flush handler crashed");
        }
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(CacheError::BackendError("disk on fire".to_string()));
        }
        self.inner.flush().await
    }

    fn available(&self) -> bool {
        self.inner.available()
    }
}

/// Wait until `check` holds, failing the test after a second
pub async fn eventually<F: Fn() -> bool>(check: F) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Wait until `joined` callers have attached to an in-flight computation
pub async fn wait_for_joiners(cache: &CacheFacade, joined: u64) {
    eventually(|| cache.stats().coalesced >= joined).await;
}

pub fn shared_memory() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::with_defaults())
}
