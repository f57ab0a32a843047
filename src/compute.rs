//! Single-flight get-or-compute over a [`CacheBackend`]
//!
//! Read path, in order:
//! 1. backend hit (non-empty, unless the empty-as-miss policy is off) returns at once;
//! 2. otherwise join the computation in flight for the key, or start one;
//! 3. the leader's task stores a successful result before deregistering.
//!
//! The backend is an optimization. Unavailable backends, read errors and
//! write errors are logged and counted, never returned.

use crate::backend::CacheBackend;
use crate::codec;
use crate::error::{CacheError, Result};
use crate::flight::{Flight, FlightGroup};
use crate::key::FullyQualifiedKey;
use crate::types::{CacheStats, ComputeOptions, Counters};
use bytes::Bytes;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Get-or-compute with at most one computation per key
pub struct SingleFlightCache {
    backend: Arc<dyn CacheBackend>,
    flights: FlightGroup,
    counters: Arc<Counters>,
    treat_empty_as_miss: bool,
}

impl SingleFlightCache {
    pub fn new(backend: Arc<dyn CacheBackend>, treat_empty_as_miss: bool) -> Self {
        Self {
            backend,
            flights: FlightGroup::new(),
            counters: Arc::new(Counters::default()),
            treat_empty_as_miss,
        }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Number of computations currently in flight
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.flights.in_flight())
    }

    /// Whether a found payload should be served
    fn is_usable(&self, value: &Bytes) -> bool {
        !(self.treat_empty_as_miss && codec::is_falsy(value))
    }

    /// Get `key` from the backend or compute it, with default options
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &FullyQualifiedKey,
        ttl: Duration,
        compute: F,
    ) -> Result<Bytes>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        self.get_or_compute_with(
            key,
            ttl,
            compute,
            &ComputeOptions::default(),
            std::future::pending(),
        )
        .await
    }

    /// Get `key` from the backend or compute it
    ///
    /// `cancel` resolving makes this caller return [`CacheError::Cancelled`];
    /// `options.timeout` elapsing makes it return [`CacheError::Timeout`].
    /// Neither stops a computation other callers may be waiting on.
    pub async fn get_or_compute_with<F, Fut, C>(
        &self,
        key: &FullyQualifiedKey,
        ttl: Duration,
        compute: F,
        options: &ComputeOptions,
        cancel: C,
    ) -> Result<Bytes>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
        C: Future<Output = ()>,
    {
        self.get_or_compute_validated(key, ttl, compute, options, cancel, &|_: &Bytes| true)
            .await
    }

    /// Like [`get_or_compute_with`](Self::get_or_compute_with), but a cached
    /// payload is only served if `accept` approves it; rejected payloads are
    /// recomputed and overwritten.
    pub async fn get_or_compute_validated<F, Fut, C>(
        &self,
        key: &FullyQualifiedKey,
        ttl: Duration,
        compute: F,
        options: &ComputeOptions,
        cancel: C,
        accept: &(dyn Fn(&Bytes) -> bool + Sync),
    ) -> Result<Bytes>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
        C: Future<Output = ()>,
    {
        if options.disable_cache {
            debug!(key = %key, "Caching disabled for call, computing directly");
            Counters::bump(&self.counters.computations);
            let panic_key = key.to_string();
            let direct = AssertUnwindSafe(async move { compute().await })
                .catch_unwind()
                .map(move |outcome| {
                    outcome.unwrap_or_else(|_| {
                        warn!(key = %panic_key, "Computation panicked");
                        Err(CacheError::ComputePanicked { key: panic_key })
                    })
                });
            return self.wait(key, options.timeout, cancel, direct).await;
        }

        let use_backend = self.backend.available();
        if use_backend {
            match self.backend.get(key.as_str()).await {
                Ok(Some(value)) if self.is_usable(&value) && accept(&value) => {
                    debug!(key = %key, "Cache hit");
                    Counters::bump(&self.counters.hits);
                    return Ok(value);
                }
                Ok(Some(_)) => debug!(key = %key, "Cached value rejected, treating as miss"),
                Ok(None) => debug!(key = %key, "Cache miss"),
                Err(err) => {
                    Counters::bump(&self.counters.read_errors);
                    warn!(key = %key, error = %err, "Cache read failed, computing instead");
                }
            }
        } else {
            Counters::bump(&self.counters.backend_bypassed);
            debug!(key = %key, "Cache backend unavailable, skipping read");
        }
        Counters::bump(&self.counters.misses);

        let backend = Arc::clone(&self.backend);
        let counters = Arc::clone(&self.counters);
        let store_key = key.as_str().to_string();

        let flight = self.flights.join_or_start(key.as_str(), move || async move {
            let value = compute().await?;

            if use_backend && backend.available() {
                if let Err(err) = backend.set(&store_key, value.clone(), ttl).await {
                    Counters::bump(&counters.write_failures);
                    let err = CacheError::BackendWriteFailed {
                        key: store_key.clone(),
                        reason: err.to_string(),
                    };
                    warn!(error = %err, "Returning computed value without caching it");
                }
            }

            Ok(value)
        });

        if flight.is_leader() {
            Counters::bump(&self.counters.computations);
        } else {
            Counters::bump(&self.counters.coalesced);
        }

        self.wait(key, options.timeout, cancel, flight.into_handle())
            .await
    }

    async fn wait<W, C>(
        &self,
        key: &FullyQualifiedKey,
        timeout: Option<Duration>,
        cancel: C,
        work: W,
    ) -> Result<Bytes>
    where
        W: Future<Output = Result<Bytes>>,
        C: Future<Output = ()>,
    {
        let bounded = async {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, work).await {
                    Ok(result) => result,
                    Err(_) => Err(CacheError::Timeout {
                        timeout_ms: millis(limit),
                        key: key.to_string(),
                    }),
                },
                None => work.await,
            }
        };

        tokio::select! {
            biased;
            result = bounded => result,
            _ = cancel => {
                debug!(key = %key, "Caller cancelled while waiting");
                Err(CacheError::Cancelled { key: key.to_string() })
            }
        }
    }
}

fn millis(limit: Duration) -> u64 {
    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX)
}
