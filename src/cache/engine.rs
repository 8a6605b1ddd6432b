//! Collaborator interfaces for the external keyed-query execution engine.
//!
//! The engine already provides per-key result storage, staleness windows,
//! garbage collection and deduplicated in-flight fetch execution. This crate
//! only parameterizes and drives it through the traits below, so every
//! component takes `Arc<dyn QueryEngine>` at construction and test suites
//! substitute in-memory doubles.

use std::future::Future;
use std::pin::Pin;
use std::time::SystemTime;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::CacheOperationError;
use super::key::QueryKey;
use super::strategy::CacheStrategy;

/// Boxed future produced by a [`ResourceFetcher`] for one resource key.
pub type FetchFuture =
    Pin<Box<dyn Future<Output = Result<serde_json::Value, CacheOperationError>> + Send>>;

/// Deferred fetch handed to the engine; the engine decides whether to run it
/// or serve the key from cache.
pub type FetchFn = Box<dyn FnOnce() -> FetchFuture + Send>;

/// Which cache entries an invalidation refetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationScope {
    /// Refetch only entries with mounted observers; inactive entries are
    /// merely marked stale.
    ActiveObservers,
    /// Refetch every matching entry.
    AllEntries,
}

/// Snapshot of a cached entry held by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct CachedEntry {
    /// When the entry data was last written.
    pub updated_at: SystemTime,
    /// Number of currently subscribed observers.
    pub observer_count: usize,
}

/// Per-key freshness parameters pushed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// Duration after which cached data is considered stale.
    pub stale_time_ms: u64,
    /// Duration after which an unobserved entry is eligible for removal.
    pub gc_time_ms: u64,
}

impl From<&CacheStrategy> for CachePolicy {
    fn from(strategy: &CacheStrategy) -> Self {
        Self {
            stale_time_ms: strategy.stale_time_ms,
            gc_time_ms: strategy.gc_time_ms,
        }
    }
}

/// Keyed-query execution engine consumed by this crate.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Speculatively populate the cache for `key`, running `fetch` unless the
    /// engine can serve the key from fresh cached data.
    async fn prefetch(&self, key: &QueryKey, fetch: FetchFn) -> Result<(), CacheOperationError>;

    /// Current cached entry for `key`, if any observer has ever fetched it
    /// and it has not been garbage collected.
    fn cached_entry(&self, key: &QueryKey) -> Option<CachedEntry>;

    /// Mark `key` stale and refetch according to `scope`.
    async fn invalidate(
        &self,
        key: &QueryKey,
        scope: InvalidationScope,
    ) -> Result<(), CacheOperationError>;

    /// Apply freshness windows for subsequent queries on `key`.
    fn set_policy(&self, key: &QueryKey, policy: CachePolicy);
}

/// Produces the fetch future for a resource key. Transport, retries and
/// response decoding live behind this seam.
pub trait ResourceFetcher: Send + Sync {
    /// Build the fetch future for `key`. The future is not started here.
    fn fetch(&self, key: &QueryKey) -> FetchFuture;
}
