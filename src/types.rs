//! Shared result and statistics types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Per-call options for get-or-compute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeOptions {
    /// Skip the backend and single flight; always run the computation
    pub disable_cache: bool,

    /// TTL for this call instead of the configured default
    pub ttl_override: Option<Duration>,

    /// How long this caller waits before giving up
    pub timeout: Option<Duration>,
}

impl ComputeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that bypass caching entirely
    pub fn uncached() -> Self {
        Self {
            disable_cache: true,
            ..Default::default()
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cache_disabled(mut self, disabled: bool) -> Self {
        self.disable_cache = disabled;
        self
    }
}

/// Outcome of a cache-wide flush
///
/// Serializes to `{"success":true}` or `{"success":false,"message":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlushResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FlushResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Snapshot of facade-level counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Calls answered from the backend
    pub hits: u64,

    /// Calls that had to join or start a computation
    pub misses: u64,

    /// Computations actually started
    pub computations: u64,

    /// Callers that joined a computation already in flight
    pub coalesced: u64,

    /// Calls that bypassed the backend because it was unavailable
    pub backend_bypassed: u64,

    /// Backend reads that errored and were treated as misses
    pub read_errors: u64,

    /// Backend writes that failed after a successful computation
    pub write_failures: u64,

    /// Computations currently in flight
    pub in_flight: usize,
}

impl CacheStats {
    /// Hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, computations: {}, coalesced: {}, write_failures: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.computations,
            self.coalesced,
            self.write_failures
        )
    }
}

/// Lock-free counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub computations: AtomicU64,
    pub coalesced: AtomicU64,
    pub backend_bypassed: AtomicU64,
    pub read_errors: AtomicU64,
    pub write_failures: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, in_flight: usize) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            backend_bypassed: self.backend_bypassed.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            in_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_result_json() {
        let ok = serde_json::to_string(&FlushResult::ok()).unwrap();
        assert_eq!(ok, r#"{"success":true}"#);

        let failed = serde_json::to_string(&FlushResult::failed("connection refused")).unwrap();
        assert_eq!(failed, r#"{"success":false,"message":"connection refused"}"#);
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = Counters::default();
        Counters::bump(&counters.hits);
        Counters::bump(&counters.hits);
        Counters::bump(&counters.coalesced);

        let stats = counters.snapshot(3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.coalesced, 1);
        assert_eq!(stats.in_flight, 3);
        assert!(format!("{}", stats).contains("hits: 2"));
    }

    #[test]
    fn test_compute_options_builders() {
        let options = ComputeOptions::new()
            .with_ttl(Duration::from_secs(5))
            .with_timeout(Duration::from_millis(10));
        assert!(!options.disable_cache);
        assert_eq!(options.ttl_override, Some(Duration::from_secs(5)));
        assert!(ComputeOptions::uncached().disable_cache);
    }
}
