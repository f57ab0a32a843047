//! # Ouroboros Object Cache (ouroboros-cache)
//!
//! A get-or-compute cache facade over pluggable object cache backends, with
//! single-flight deduplication of concurrent computations.
//!
//! ## Features
//!
//! - At most one computation per key at a time; concurrent callers share its result
//! - Key namespacing by group and tenant with an injective key encoding
//! - Backend-agnostic: anything implementing [`CacheBackend`]
//! - Graceful degradation when the backend is offline or failing
//! - Cache-wide flush that reports failure instead of raising
//! - Per-call TTL override, cache bypass, timeout and cancellation
//!
//! ## Architecture
//!
//! - [`backend`]: storage contract plus an in-memory reference backend
//! - [`key`]: logical key + group + tenant -> [`FullyQualifiedKey`]
//! - [`flight`]: in-flight registry
//! - [`compute`]: single-flight get-or-compute over a backend
//! - [`facade`]: the public [`CacheFacade`]
//!
//! ## Example
//!
//! ```no_run
//! use ouroboros_cache::{CacheConfig, CacheFacade, ComputeOptions, MemoryBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CacheConfig::builder()
//!         .app_name("My Plugin")
//!         .build();
//!     let cache = CacheFacade::new(Arc::new(MemoryBackend::with_defaults()), config)?;
//!
//!     let posts = cache
//!         .get_or_compute_json("recent_posts", None, || async {
//!             Ok::<_, anyhow::Error>(vec!["hello".to_string(), "world".to_string()])
//!         }, ComputeOptions::default())
//!         .await?;
//!     println!("{:?}", posts);
//!
//!     cache.invalidate("recent_posts", None).await?;
//!     println!("{}", cache.stats());
//!     Ok(())
//! }
//! ```
//!
//! ## Empty values
//!
//! By default a cached payload that is empty or exactly `0` counts as a miss
//! and is recomputed. Values read through `get_or_compute_json` additionally
//! treat JSON `false`, `null`, `0.0`, `""`, `"0"`, `[]` and `{}` as misses.
//! Callers that cache legitimately empty results should either wrap them or
//! build the facade with `treat_empty_as_miss(false)`.

pub mod backend;
pub mod codec;
pub mod compute;
pub mod config;
pub mod error;
pub mod facade;
pub mod flight;
pub mod key;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendStats, CacheBackend, CacheEntry, MemoryBackend, MemoryBackendConfig};
pub use compute::SingleFlightCache;
pub use config::{CacheConfig, CacheConfigBuilder, DEFAULT_TTL_SECS};
pub use error::{CacheError, Result};
pub use facade::CacheFacade;
pub use flight::{Flight, FlightGroup, FlightHandle};
pub use key::{build_key, FullyQualifiedKey, TenantScope};
pub use types::{CacheStats, ComputeOptions, FlushResult};
