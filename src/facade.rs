//! Public cache facade
//!
//! Composes key namespacing with the single-flight cache. This is the only
//! type most callers need:
//!
//! ```no_run
//! use ouroboros_cache::{CacheConfig, CacheFacade, ComputeOptions, MemoryBackend};
//! use std::sync::Arc;
//!
//! # async fn example() -> ouroboros_cache::Result<()> {
//! let cache = CacheFacade::new(Arc::new(MemoryBackend::with_defaults()), CacheConfig::default())?;
//!
//! let value = cache
//!     .get_or_compute("recent_posts", None, || async {
//!         Ok::<_, std::io::Error>("rendered html")
//!     }, ComputeOptions::default())
//!     .await?;
//!
//! let flushed = cache.flush().await;
//! assert!(flushed.success);
//! # Ok(())
//! # }
//! ```

use crate::backend::CacheBackend;
use crate::codec;
use crate::compute::SingleFlightCache;
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::key::{build_key, FullyQualifiedKey, TenantScope};
use crate::types::{CacheStats, ComputeOptions, FlushResult};
use bytes::Bytes;
use futures::FutureExt;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Get-or-compute cache with namespacing, flush and invalidation
///
/// Cloning is cheap; clones and [`with_tenant`](Self::with_tenant) handles
/// share the backend, the in-flight registry and the stats.
#[derive(Clone)]
pub struct CacheFacade {
    config: Arc<CacheConfig>,
    group: Arc<str>,
    tenant: TenantScope,
    cache: Arc<SingleFlightCache>,
}

impl CacheFacade {
    /// Create a facade over `backend`
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Result<Self> {
        config.validate()?;

        let group: Arc<str> = config.group().into();
        info!(
            group = %group,
            multi_tenant = config.multi_tenant,
            default_ttl_secs = config.default_ttl.as_secs(),
            "Initializing cache facade"
        );

        let cache = SingleFlightCache::new(backend, config.treat_empty_as_miss);
        Ok(Self {
            tenant: config.effective_tenant(),
            group,
            config: Arc::new(config),
            cache: Arc::new(cache),
        })
    }

    /// Handle scoped to another tenant
    ///
    /// In single-tenant mode the scope is ignored and keys stay global.
    pub fn with_tenant(&self, tenant: TenantScope) -> Self {
        let mut scoped = self.clone();
        scoped.tenant = if self.config.multi_tenant {
            tenant
        } else {
            TenantScope::Global
        };
        scoped
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Default group for calls that don't name one
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Tenant this handle scopes keys to
    pub fn tenant(&self) -> TenantScope {
        self.tenant
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        self.cache.backend()
    }

    /// Fully-qualified key for a logical key in `group` (or the default group)
    pub fn key_for(&self, logical_key: &str, group: Option<&str>) -> Result<FullyQualifiedKey> {
        build_key(logical_key, group.unwrap_or(&self.group), self.tenant)
    }

    fn ttl_for(&self, options: &ComputeOptions) -> Result<Duration> {
        let base = match options.ttl_override {
            Some(ttl) if ttl.is_zero() => {
                return Err(CacheError::ConfigError(
                    "ttl_override must be greater than 0".to_string(),
                ))
            }
            Some(ttl) => ttl,
            None => self.config.default_ttl,
        };
        Ok(self.config.ttl_with_jitter(base))
    }

    /// Return the cached value for `logical_key`, or compute and cache it
    ///
    /// Concurrent callers for the same key share one computation. Only
    /// invalid keys and the computation's own outcome are returned as errors;
    /// backend trouble falls back to computing directly.
    pub async fn get_or_compute<F, Fut, V, E>(
        &self,
        logical_key: &str,
        group: Option<&str>,
        compute: F,
        options: ComputeOptions,
    ) -> Result<Bytes>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        V: Into<Bytes>,
        E: Into<anyhow::Error>,
    {
        self.get_or_compute_cancellable(logical_key, group, compute, options, std::future::pending())
            .await
    }

    /// [`get_or_compute`](Self::get_or_compute) that gives up when `cancel` resolves
    ///
    /// Cancelling only releases this caller; the computation keeps running
    /// for anyone else joined to it and still populates the cache.
    pub async fn get_or_compute_cancellable<F, Fut, V, E, C>(
        &self,
        logical_key: &str,
        group: Option<&str>,
        compute: F,
        options: ComputeOptions,
        cancel: C,
    ) -> Result<Bytes>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        V: Into<Bytes>,
        E: Into<anyhow::Error>,
        C: Future<Output = ()>,
    {
        let key = self.key_for(logical_key, group)?;
        let ttl = self.ttl_for(&options)?;

        let compute = move || async move {
            let value: V = compute().await.map_err(CacheError::compute)?;
            Ok::<Bytes, CacheError>(value.into())
        };

        self.cache
            .get_or_compute_with(&key, ttl, compute, &options, cancel)
            .await
    }

    /// Typed get-or-compute, stored as JSON
    ///
    /// Cached payloads that no longer decode as `T` are treated as a miss and
    /// overwritten with a fresh value. Under the empty-as-miss policy, JSON
    /// encodings of falsy values (`null`, `false`, `0`, `""`, `[]`, `{}`) are
    /// misses too.
    pub async fn get_or_compute_json<T, F, Fut, E>(
        &self,
        logical_key: &str,
        group: Option<&str>,
        compute: F,
        options: ComputeOptions,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<anyhow::Error>,
    {
        let key = self.key_for(logical_key, group)?;
        let ttl = self.ttl_for(&options)?;

        let compute = move || async move {
            let value = compute().await.map_err(CacheError::compute)?;
            codec::encode_json(&value)
        };
        let treat_empty_as_miss = self.config.treat_empty_as_miss;
        let decodes = move |payload: &Bytes| {
            !(treat_empty_as_miss && codec::is_falsy_json(payload))
                && codec::decode_json::<T>(payload).is_ok()
        };

        let payload = self
            .cache
            .get_or_compute_validated(
                &key,
                ttl,
                compute,
                &options,
                std::future::pending(),
                &decodes,
            )
            .await?;

        codec::decode_json(&payload)
    }

    /// Flush the entire backend
    ///
    /// Clears every group and tenant, not only this facade's. Never fails:
    /// backend errors (and panics) come back as `success: false` with the
    /// backend's message. Computations in flight are left alone and may
    /// repopulate their keys after the flush.
    pub async fn flush(&self) -> FlushResult {
        let flushed = AssertUnwindSafe(self.cache.backend().flush())
            .catch_unwind()
            .await;

        match flushed {
            Ok(Ok(())) => {
                info!("Object cache flushed");
                FlushResult::ok()
            }
            Ok(Err(err)) => {
                let failure = CacheError::BackendFlushFailed(err.to_string());
                warn!(error = %failure, "Flush failed");
                FlushResult::failed(err.to_string())
            }
            Err(_) => {
                let message = "cache backend panicked during flush";
                let failure = CacheError::BackendFlushFailed(message.to_string());
                warn!(error = %failure, "Flush failed");
                FlushResult::failed(message)
            }
        }
    }

    /// Remove one entry, returning whether it existed
    ///
    /// Backend failures are logged and reported as `Ok(false)`.
    pub async fn invalidate(&self, logical_key: &str, group: Option<&str>) -> Result<bool> {
        let key = self.key_for(logical_key, group)?;
        let backend = self.cache.backend();

        if !backend.available() {
            debug!(key = %key, "Cache backend unavailable, nothing to invalidate");
            return Ok(false);
        }

        match backend.delete(key.as_str()).await {
            Ok(removed) => {
                debug!(key = %key, removed, "Invalidated cache entry");
                Ok(removed)
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Cache invalidation failed");
                Ok(false)
            }
        }
    }

    /// Counters shared by this facade and its tenant handles
    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Number of computations currently in flight
    pub fn in_flight(&self) -> usize {
        self.cache.in_flight()
    }
}
