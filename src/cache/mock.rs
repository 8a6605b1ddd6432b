//! In-memory collaborator doubles shared by the test suites.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use super::engine::{
    CachePolicy, CachedEntry, FetchFn, FetchFuture, InvalidationScope, QueryEngine,
    ResourceFetcher,
};
use super::error::CacheOperationError;
use super::key::QueryKey;

/// Query engine double that records every call it receives.
#[derive(Debug, Default)]
pub struct MockEngine {
    prefetches: DashMap<QueryKey, u64>,
    invalidations: DashMap<QueryKey, u64>,
    policies: DashMap<QueryKey, CachePolicy>,
    entries: DashMap<QueryKey, CachedEntry>,
    fail_invalidations: AtomicBool,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an observer having fetched `key`.
    pub fn insert_entry(&self, key: &QueryKey) {
        self.entries.insert(
            key.clone(),
            CachedEntry {
                updated_at: SystemTime::now(),
                observer_count: 1,
            },
        );
    }

    /// Make subsequent invalidations fail (or succeed again).
    pub fn fail_invalidations(&self, fail: bool) {
        self.fail_invalidations.store(fail, Ordering::SeqCst);
    }

    pub fn prefetch_count(&self, key: &QueryKey) -> u64 {
        self.prefetches.get(key).map(|count| *count).unwrap_or(0)
    }

    pub fn invalidation_count(&self, key: &QueryKey) -> u64 {
        self.invalidations.get(key).map(|count| *count).unwrap_or(0)
    }

    pub fn policy_for(&self, key: &QueryKey) -> Option<CachePolicy> {
        self.policies.get(key).map(|policy| *policy)
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn prefetch(&self, key: &QueryKey, fetch: FetchFn) -> Result<(), CacheOperationError> {
        *self.prefetches.entry(key.clone()).or_insert(0) += 1;
        fetch().await?;
        self.insert_entry(key);
        Ok(())
    }

    fn cached_entry(&self, key: &QueryKey) -> Option<CachedEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    async fn invalidate(
        &self,
        key: &QueryKey,
        _scope: InvalidationScope,
    ) -> Result<(), CacheOperationError> {
        *self.invalidations.entry(key.clone()).or_insert(0) += 1;
        if self.fail_invalidations.load(Ordering::SeqCst) {
            return Err(CacheOperationError::invalidation_failed("mock failure"));
        }
        Ok(())
    }

    fn set_policy(&self, key: &QueryKey, policy: CachePolicy) {
        self.policies.insert(key.clone(), policy);
    }
}

/// Resource fetcher double with per-key call counts, injectable failures
/// and an optional artificial delay.
#[derive(Debug, Default)]
pub struct MockFetcher {
    calls: DashMap<QueryKey, u64>,
    failing: DashSet<QueryKey>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make fetches for `key` fail.
    pub fn fail_for(&self, key: &QueryKey) {
        self.failing.insert(key.clone());
    }

    pub fn fetch_count(&self, key: &QueryKey) -> u64 {
        self.calls.get(key).map(|count| *count).unwrap_or(0)
    }
}

impl ResourceFetcher for MockFetcher {
    fn fetch(&self, key: &QueryKey) -> FetchFuture {
        *self.calls.entry(key.clone()).or_insert(0) += 1;
        let fail = self.failing.contains(key);
        let delay = self.delay;
        let key = key.clone();
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                Err(CacheOperationError::fetch_failed(format!(
                    "mock fetch failure for {key}"
                )))
            } else {
                Ok(serde_json::json!({ "key": key.to_string() }))
            }
        })
    }
}
