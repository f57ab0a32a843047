//! In-flight registry: one computation per key, shared by every caller
//!
//! The leader's work runs on its own tokio task. Callers hold a
//! [`FlightHandle`], a shared future over that task's join handle, so a
//! caller that stops waiting never cancels the work for the others.
//!
//! The registry entry is removed by a guard owned by the task. The guard
//! drops when the work finishes, fails, panics or is aborted, so entries
//! never outlive their computation.

use crate::error::{CacheError, Result};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinError;
use tracing::{debug, warn};

/// Shared result of one computation
pub type FlightHandle = Shared<BoxFuture<'static, Result<Bytes>>>;

/// How a caller got attached to a computation
pub enum Flight {
    /// This caller registered the computation
    Leader(FlightHandle),
    /// A computation was already running
    Follower(FlightHandle),
}

impl Flight {
    pub fn is_leader(&self) -> bool {
        matches!(self, Flight::Leader(_))
    }

    pub fn into_handle(self) -> FlightHandle {
        match self {
            Flight::Leader(handle) | Flight::Follower(handle) => handle,
        }
    }
}

/// Registry of computations in flight, keyed by fully-qualified key
#[derive(Clone, Default)]
pub struct FlightGroup {
    inner: Arc<Registry>,
}

#[derive(Default)]
struct Registry {
    flights: Mutex<HashMap<String, InFlight>>,
    next_id: AtomicU64,
}

struct InFlight {
    id: u64,
    handle: FlightHandle,
}

impl Registry {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        // Nothing panics while holding the lock, but don't wedge if it ever does
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FlightGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the computation for `key`, or start `work` if there is none
    ///
    /// Lookup and registration happen under one lock, so two callers can
    /// never both become leader for the same key. `work` is only invoked for
    /// the leader, on a spawned task. Must be called inside a tokio runtime.
    pub fn join_or_start<F, Fut>(&self, key: &str, work: F) -> Flight
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Bytes>> + Send + 'static,
    {
        let mut flights = self.inner.lock();

        if let Some(existing) = flights.get(key) {
            debug!(key, "Joining computation in flight");
            return Flight::Follower(existing.handle.clone());
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = Deregister {
            registry: Arc::clone(&self.inner),
            key: key.to_string(),
            id,
        };

        let task = tokio::spawn(async move {
            let _guard = guard;
            work().await
        });

        let owned_key = key.to_string();
        let handle = task
            .map(move |joined| settle(&owned_key, joined))
            .boxed()
            .shared();

        flights.insert(
            key.to_string(),
            InFlight {
                id,
                handle: handle.clone(),
            },
        );
        debug!(key, id, "Started computation");

        Flight::Leader(handle)
    }

    /// Number of computations currently registered
    pub fn in_flight(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether a computation for `key` is registered
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.lock().contains_key(key)
    }
}

fn settle(key: &str, joined: std::result::Result<Result<Bytes>, JoinError>) -> Result<Bytes> {
    match joined {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => {
            warn!(key, "Computation panicked");
            Err(CacheError::ComputePanicked {
                key: key.to_string(),
            })
        }
        Err(_) => Err(CacheError::ComputeAborted {
            key: key.to_string(),
        }),
    }
}

/// Removes a flight's registry entry when its task ends
struct Deregister {
    registry: Arc<Registry>,
    key: String,
    id: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        let mut flights = self.registry.lock();
        // The id check keeps a finished flight from removing a newer one
        if flights.get(&self.key).map(|f| f.id) == Some(self.id) {
            flights.remove(&self.key);
            debug!(key = %self.key, id = self.id, "Computation finished");
        }
    }
}
