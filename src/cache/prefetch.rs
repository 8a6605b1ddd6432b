//! Speculative fetching for resources predicted to be needed soon.
//!
//! Every speculative fetch is deduplicated against an in-flight set: a key
//! is inserted synchronously before its fetch starts and removed after the
//! fetch settles, so at most one speculative fetch per key is ever in
//! flight regardless of how many callers request it. Failures are logged
//! with the failing key and never propagate to the caller.

use std::sync::Arc;

use dashmap::DashSet;
use futures::future::join_all;
use serde::Serialize;

use super::engine::{FetchFn, QueryEngine, ResourceFetcher};
use super::key::QueryKey;

/// Scroll position above which the next list page is worth prefetching.
const NEXT_PAGE_SCROLL_THRESHOLD: f64 = 0.7;

/// Observability snapshot of the in-flight set.
#[derive(Debug, Clone, Serialize)]
pub struct PrefetcherStatus {
    pub queue_size: usize,
    pub in_flight: Vec<String>,
}

/// Issues deduplicated speculative fetches through the query engine.
pub struct IntelligentPrefetcher {
    engine: Arc<dyn QueryEngine>,
    fetcher: Arc<dyn ResourceFetcher>,
    in_flight: DashSet<QueryKey>,
}

impl IntelligentPrefetcher {
    /// Create a prefetcher with an empty in-flight set.
    pub fn new(engine: Arc<dyn QueryEngine>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self {
            engine,
            fetcher,
            in_flight: DashSet::new(),
        }
    }

    /// Prefetch detail records for the part of the visible set still ahead
    /// of the user's scroll position.
    ///
    /// With `scroll_position` in `[0, 1]`, the first
    /// `ceil(len * (1 - scroll_position))` keys of `visible` are taken, in
    /// list order. Returns how many fetches were actually issued after
    /// deduplication; the batch settles with all-settle semantics.
    pub async fn prefetch_details(&self, visible: &[QueryKey], scroll_position: f64) -> usize {
        let scroll = scroll_position.clamp(0.0, 1.0);
        let priority_count = (visible.len() as f64 * (1.0 - scroll)).ceil() as usize;

        let mut batch = Vec::new();
        for key in visible.iter().take(priority_count) {
            // insert() is the atomic check-then-add that enforces the
            // at-most-one-in-flight invariant.
            if self.in_flight.insert(key.clone()) {
                batch.push(self.run_prefetch(key.clone()));
            }
        }

        let issued = batch.len();
        join_all(batch).await;
        issued
    }

    /// Prefetch the next page of a filtered list.
    ///
    /// Callers near the end of the current page pass their scroll position;
    /// anything at or below the threshold is a no-op. `None` means the
    /// caller has no scroll information and the prefetch proceeds. Returns
    /// whether a fetch was issued.
    pub async fn prefetch_next_page(
        &self,
        filters: &serde_json::Value,
        current_page: u32,
        scroll_position: Option<f64>,
    ) -> bool {
        if let Some(scroll) = scroll_position {
            if scroll <= NEXT_PAGE_SCROLL_THRESHOLD {
                return false;
            }
        }

        let key = QueryKey::exam_list(filters, current_page + 1);
        if !self.in_flight.insert(key.clone()) {
            return false;
        }
        self.run_prefetch(key).await;
        true
    }

    /// Prefetch the fixed set of resources dependent on `group`, each
    /// independently deduplicated, with all-settle semantics. Returns how
    /// many fetches were issued.
    pub async fn prefetch_related(&self, group: &QueryKey) -> usize {
        let related = related_resources(group);
        if related.is_empty() {
            log::debug!("no related resources for group {group}");
            return 0;
        }

        let mut batch = Vec::new();
        for key in related {
            if self.in_flight.insert(key.clone()) {
                batch.push(self.run_prefetch(key));
            }
        }

        let issued = batch.len();
        join_all(batch).await;
        issued
    }

    /// Current queue size and in-flight key serializations.
    pub fn status(&self) -> PrefetcherStatus {
        let in_flight: Vec<String> = self.in_flight.iter().map(|key| key.to_string()).collect();
        PrefetcherStatus {
            queue_size: in_flight.len(),
            in_flight,
        }
    }

    /// Drive one speculative fetch to completion and release its in-flight
    /// slot. The caller must have inserted `key` into the set already.
    async fn run_prefetch(&self, key: QueryKey) {
        let fetch_future = self.fetcher.fetch(&key);
        let fetch: FetchFn = Box::new(move || fetch_future);

        match self.engine.prefetch(&key, fetch).await {
            Ok(()) => log::debug!("prefetched {key}"),
            Err(err) => log::warn!("speculative prefetch for {key} failed: {err}"),
        }

        self.in_flight.remove(&key);
    }
}

/// Fixed dependent-resource set for a group key.
fn related_resources(group: &QueryKey) -> Vec<QueryKey> {
    match (group.family(), group.segment(1)) {
        ("grade", Some(grade)) => vec![
            QueryKey::grade_statistics(grade),
            QueryKey::exam_list(&serde_json::json!({ "grade": grade }), 1),
            QueryKey::dashboard_summary(),
        ],
        _ => Vec::new(),
    }
}
