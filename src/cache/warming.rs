//! Best-effort cache warming at session start.
//!
//! Warming issues batches of prefetches for known high-value resource
//! groups directly against the query engine; there is no per-key history
//! yet at startup. Every batch member is attempted regardless of the
//! others' outcomes and the operation as a whole never fails. If warming
//! fails entirely, first real user requests fall through to normal fetch.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;

use super::engine::{FetchFn, QueryEngine, ResourceFetcher};
use super::key::QueryKey;

/// Outcome summary of one warming run.
#[derive(Debug, Clone, Serialize)]
pub struct WarmingStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl WarmingStats {
    fn merge(mut self, other: WarmingStats) -> Self {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.elapsed += other.elapsed;
        self
    }
}

/// What to warm at application start.
#[derive(Debug, Clone, Default)]
pub struct WarmingOptions {
    /// Grades whose dashboard resources should be warmed.
    pub grades: Vec<String>,
    /// Common list filter sets whose first pages should be warmed.
    pub list_filter_sets: Vec<serde_json::Value>,
    /// Restrict dashboard warming to this single grade when set.
    pub only_grade: Option<String>,
}

/// Issues startup prefetch batches for known high-value resources.
pub struct CacheWarmingCoordinator {
    engine: Arc<dyn QueryEngine>,
    fetcher: Arc<dyn ResourceFetcher>,
}

impl CacheWarmingCoordinator {
    pub fn new(engine: Arc<dyn QueryEngine>, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        Self { engine, fetcher }
    }

    /// Warm the dashboard summary and per-grade statistics.
    pub async fn warm_dashboard(&self, valid_grades: &[String]) -> WarmingStats {
        let mut keys = vec![QueryKey::dashboard_summary()];
        keys.extend(valid_grades.iter().map(|grade| QueryKey::grade_statistics(grade)));
        self.warm_batch("dashboard", keys).await
    }

    /// Warm the first page of each commonly used list filter set.
    pub async fn warm_list_view(&self, common_filter_sets: &[serde_json::Value]) -> WarmingStats {
        let keys = common_filter_sets
            .iter()
            .map(|filters| QueryKey::exam_list(filters, 1))
            .collect();
        self.warm_batch("list view", keys).await
    }

    /// Warm everything configured in `options` and log the aggregate outcome.
    pub async fn warm_application(&self, options: &WarmingOptions) -> WarmingStats {
        let started = Instant::now();

        let grades: Vec<String> = match &options.only_grade {
            Some(grade) => options
                .grades
                .iter()
                .filter(|g| *g == grade)
                .cloned()
                .collect(),
            None => options.grades.clone(),
        };

        let stats = self
            .warm_dashboard(&grades)
            .await
            .merge(self.warm_list_view(&options.list_filter_sets).await);

        log::info!(
            "cache warming finished in {:?}: {} of {} prefetches succeeded",
            started.elapsed(),
            stats.succeeded,
            stats.attempted,
        );
        stats
    }

    /// Run one all-settle prefetch batch. Individual failures are logged
    /// and counted; they never abort siblings or the batch.
    async fn warm_batch(&self, label: &str, keys: Vec<QueryKey>) -> WarmingStats {
        let started = Instant::now();
        let attempted = keys.len();

        let tasks = keys.into_iter().map(|key| {
            let engine = Arc::clone(&self.engine);
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let fetch_future = fetcher.fetch(&key);
                let fetch: FetchFn = Box::new(move || fetch_future);
                match engine.prefetch(&key, fetch).await {
                    Ok(()) => true,
                    Err(err) => {
                        log::warn!("cache warming of {key} failed: {err}");
                        false
                    }
                }
            }
        });

        let succeeded = join_all(tasks).await.into_iter().filter(|ok| *ok).count();
        let stats = WarmingStats {
            attempted,
            succeeded,
            failed: attempted - succeeded,
            elapsed: started.elapsed(),
        };
        log::debug!(
            "warmed {label}: {} of {} prefetches in {:?}",
            stats.succeeded,
            stats.attempted,
            stats.elapsed,
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::mock::{MockEngine, MockFetcher};

    fn coordinator_with(
        engine: Arc<MockEngine>,
        fetcher: Arc<MockFetcher>,
    ) -> CacheWarmingCoordinator {
        CacheWarmingCoordinator::new(engine, fetcher)
    }

    #[tokio::test]
    async fn dashboard_warming_covers_summary_and_grades() {
        let engine = Arc::new(MockEngine::new());
        let fetcher = Arc::new(MockFetcher::new());
        let coordinator = coordinator_with(engine.clone(), fetcher.clone());
        let grades = vec!["7a".to_string(), "7b".to_string()];

        let stats = coordinator.warm_dashboard(&grades).await;

        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.succeeded, 3);
        assert_eq!(fetcher.fetch_count(&QueryKey::dashboard_summary()), 1);
        assert_eq!(fetcher.fetch_count(&QueryKey::grade_statistics("7a")), 1);
        assert_eq!(fetcher.fetch_count(&QueryKey::grade_statistics("7b")), 1);
    }

    #[tokio::test]
    async fn a_failing_member_does_not_abort_its_siblings() {
        let engine = Arc::new(MockEngine::new());
        let fetcher = Arc::new(MockFetcher::new());
        let grades = vec!["7a".to_string(), "7b".to_string()];
        fetcher.fail_for(&QueryKey::grade_statistics("7a"));
        let coordinator = coordinator_with(engine.clone(), fetcher.clone());

        let stats = coordinator.warm_dashboard(&grades).await;

        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(engine.prefetch_count(&QueryKey::grade_statistics("7b")), 1);
        assert_eq!(engine.prefetch_count(&QueryKey::dashboard_summary()), 1);
    }

    #[tokio::test]
    async fn warm_application_composes_and_can_restrict_to_one_grade() {
        let engine = Arc::new(MockEngine::new());
        let fetcher = Arc::new(MockFetcher::new());
        let coordinator = coordinator_with(engine.clone(), fetcher.clone());
        let options = WarmingOptions {
            grades: vec!["7a".to_string(), "7b".to_string()],
            list_filter_sets: vec![serde_json::json!({ "grade": "7a" })],
            only_grade: Some("7a".to_string()),
        };

        let stats = coordinator.warm_application(&options).await;

        // Summary + the one selected grade + one list page.
        assert_eq!(stats.attempted, 3);
        assert_eq!(fetcher.fetch_count(&QueryKey::grade_statistics("7b")), 0);
        assert_eq!(
            fetcher.fetch_count(&QueryKey::exam_list(&serde_json::json!({ "grade": "7a" }), 1)),
            1
        );
    }

    #[tokio::test]
    async fn warming_never_fails_even_when_everything_fails() {
        let engine = Arc::new(MockEngine::new());
        let fetcher = Arc::new(MockFetcher::new());
        let grades = vec!["7a".to_string()];
        fetcher.fail_for(&QueryKey::dashboard_summary());
        fetcher.fail_for(&QueryKey::grade_statistics("7a"));
        let coordinator = coordinator_with(engine, fetcher);

        let stats = coordinator.warm_dashboard(&grades).await;
        assert_eq!(stats.succeeded, 0);
        assert_eq!(stats.failed, 2);
    }
}
