//! Stored entries with TTL support

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A stored payload with its expiry
///
/// Owned by the backend; readers only ever get a clone of `value`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached payload
    pub value: Bytes,

    /// When the entry was written
    pub created_at: DateTime<Utc>,

    /// When the entry expires
    pub expires_at: DateTime<Utc>,

    /// Number of reads served from this entry
    pub access_count: u64,
}

impl CacheEntry {
    /// Create a new entry expiring after `ttl`
    pub fn new(value: Bytes, ttl: Duration) -> Self {
        let now = Utc::now();
        // Out-of-range TTLs saturate instead of wrapping
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            created_at: now,
            expires_at,
            access_count: 0,
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Mark the entry as read
    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
    }
}
