//! Cache coordination orchestrator.
//!
//! Owns one instance of each cooperating component and is the only type
//! the rest of the application talks to. All keyed registries are instance
//! state injected at construction, so every test can build a fresh manager.

use std::sync::Arc;

use serde::Serialize;

use super::engine::{CachePolicy, QueryEngine, ResourceFetcher};
use super::error::CacheOperationError;
use super::key::QueryKey;
use super::prefetch::{IntelligentPrefetcher, PrefetcherStatus};
use super::strategy::{AdaptiveStrategyEngine, CacheStrategy};
use super::sync::{BackgroundSyncManager, SyncStatus};
use super::warming::{CacheWarmingCoordinator, WarmingOptions};
use crate::telemetry::monitor::PerformanceMonitor;
use crate::telemetry::types::PerformanceReport;

/// Unified snapshot of the coordinator's observable state.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatusSnapshot {
    pub prefetch: PrefetcherStatus,
    pub sync: SyncStatus,
    /// Present only while performance monitoring is enabled.
    pub performance: Option<PerformanceReport>,
}

/// Options for [`CacheManager::initialize`].
#[derive(Debug, Clone, Default)]
pub struct InitializeOptions {
    /// Warm these resources before returning. Skipped when `None`.
    pub warming: Option<WarmingOptions>,
}

/// Builder for [`CacheManager`].
pub struct CacheManagerBuilder {
    engine: Option<Arc<dyn QueryEngine>>,
    fetcher: Option<Arc<dyn ResourceFetcher>>,
    monitoring: bool,
}

impl Default for CacheManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheManagerBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            fetcher: None,
            monitoring: true,
        }
    }

    /// Query engine the coordinator drives.
    pub fn engine(mut self, engine: Arc<dyn QueryEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Fetch source for speculative work.
    pub fn fetcher(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Enable or disable performance monitoring. Enabled by default.
    pub fn monitoring(mut self, enabled: bool) -> Self {
        self.monitoring = enabled;
        self
    }

    pub fn build(self) -> Result<CacheManager, CacheOperationError> {
        let engine = self
            .engine
            .ok_or_else(|| CacheOperationError::invalid_configuration("query engine is required"))?;
        let fetcher = self.fetcher.ok_or_else(|| {
            CacheOperationError::invalid_configuration("resource fetcher is required")
        })?;
        Ok(CacheManager::new(engine, fetcher, self.monitoring))
    }
}

/// Orchestrator over adaptive strategy, prefetching, background sync,
/// warming and performance monitoring.
pub struct CacheManager {
    engine: Arc<dyn QueryEngine>,
    strategy: Arc<AdaptiveStrategyEngine>,
    prefetcher: Arc<IntelligentPrefetcher>,
    sync: Arc<BackgroundSyncManager>,
    warming: Arc<CacheWarmingCoordinator>,
    monitor: Arc<PerformanceMonitor>,
}

impl CacheManager {
    /// Build a manager with fresh component state. Most callers go through
    /// [`CacheManagerBuilder`].
    pub fn new(
        engine: Arc<dyn QueryEngine>,
        fetcher: Arc<dyn ResourceFetcher>,
        monitoring: bool,
    ) -> Self {
        Self {
            strategy: Arc::new(AdaptiveStrategyEngine::new()),
            prefetcher: Arc::new(IntelligentPrefetcher::new(
                Arc::clone(&engine),
                Arc::clone(&fetcher),
            )),
            sync: Arc::new(BackgroundSyncManager::new(Arc::clone(&engine))),
            warming: Arc::new(CacheWarmingCoordinator::new(Arc::clone(&engine), fetcher)),
            monitor: Arc::new(PerformanceMonitor::new(monitoring)),
            engine,
        }
    }

    /// Start the coordinator, optionally warming high-value resources.
    pub async fn initialize(&self, options: InitializeOptions) {
        log::info!("cache manager initializing");
        if let Some(warming) = &options.warming {
            self.warming.warm_application(warming).await;
        }
    }

    /// Record one settled query: feeds the adaptive strategy engine and the
    /// performance monitor. Infallible.
    pub fn record_query(&self, key: &QueryKey, response_time_ms: f64, is_hit: bool, has_error: bool) {
        self.strategy.record_query(key, response_time_ms, is_hit);
        self.monitor
            .record_query_execution(key, response_time_ms, is_hit, has_error);
    }

    /// Recompute the optimized strategy for `key` and push its freshness
    /// windows to the engine for subsequent calls on that key. Policy is
    /// eventually consistent: it applies from the next query, never
    /// retroactively.
    pub fn refresh_policy(&self, key: &QueryKey) -> CacheStrategy {
        let strategy = self.strategy.optimized_strategy(key);
        self.engine.set_policy(key, CachePolicy::from(&strategy));
        strategy
    }

    /// Unified status snapshot across all components.
    pub fn cache_status(&self) -> CacheStatusSnapshot {
        CacheStatusSnapshot {
            prefetch: self.prefetcher.status(),
            sync: self.sync.status(),
            performance: self
                .monitor
                .is_enabled()
                .then(|| self.monitor.report()),
        }
    }

    /// Release background resources. Safe to call on every shutdown path
    /// and safe to call more than once; only the sync timers hold resources
    /// that outlive the manager's last reference.
    pub fn cleanup(&self) {
        self.sync.stop_all();
        log::info!("cache manager cleaned up");
    }

    /// Adaptive strategy engine.
    pub fn strategy(&self) -> &AdaptiveStrategyEngine {
        &self.strategy
    }

    /// Speculative prefetcher.
    pub fn prefetcher(&self) -> &IntelligentPrefetcher {
        &self.prefetcher
    }

    /// Background sync timer lifecycle.
    pub fn sync_manager(&self) -> &BackgroundSyncManager {
        &self.sync
    }

    /// Startup warming coordinator.
    pub fn warming(&self) -> &CacheWarmingCoordinator {
        &self.warming
    }

    /// Query performance monitor.
    pub fn monitor(&self) -> &PerformanceMonitor {
        &self.monitor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::mock::{MockEngine, MockFetcher};

    fn manager_with(engine: Arc<MockEngine>, monitoring: bool) -> CacheManager {
        CacheManagerBuilder::new()
            .engine(engine)
            .fetcher(Arc::new(MockFetcher::new()))
            .monitoring(monitoring)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_both_collaborators() {
        assert!(matches!(
            CacheManagerBuilder::new().build(),
            Err(CacheOperationError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            CacheManagerBuilder::new()
                .engine(Arc::new(MockEngine::new()))
                .build(),
            Err(CacheOperationError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn initialize_warms_when_asked() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine.clone(), true);

        manager
            .initialize(InitializeOptions {
                warming: Some(WarmingOptions {
                    grades: vec!["7a".to_string()],
                    ..WarmingOptions::default()
                }),
            })
            .await;

        assert_eq!(engine.prefetch_count(&QueryKey::dashboard_summary()), 1);
        assert_eq!(engine.prefetch_count(&QueryKey::grade_statistics("7a")), 1);
    }

    #[tokio::test]
    async fn initialize_without_warming_is_quiet() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine.clone(), true);

        manager.initialize(InitializeOptions::default()).await;
        assert_eq!(engine.prefetch_count(&QueryKey::dashboard_summary()), 0);
    }

    #[test]
    fn refresh_policy_pushes_windows_to_the_engine() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine.clone(), true);
        let key = QueryKey::exam_detail("1");

        let strategy = manager.refresh_policy(&key);

        let policy = engine.policy_for(&key).unwrap();
        assert_eq!(policy.stale_time_ms, strategy.stale_time_ms);
        assert_eq!(policy.gc_time_ms, strategy.gc_time_ms);
        assert_eq!(strategy, CacheStrategy::dynamic());
    }

    #[test]
    fn record_query_feeds_strategy_and_monitor() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine, true);
        let key = QueryKey::exam_detail("2");

        manager.record_query(&key, 120.0, true, false);
        manager.record_query(&key, 80.0, false, true);

        let metrics = manager.strategy().metrics_for(&key).unwrap();
        assert_eq!(metrics.total_queries, 2);
        assert_eq!(manager.monitor().report().total_queries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn status_aggregates_all_components() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine, true);
        let key = QueryKey::exam_detail("3");

        manager.sync_manager().start(&key, 1_000);
        manager.record_query(&key, 100.0, true, false);

        let status = manager.cache_status();
        assert_eq!(status.sync.count, 1);
        assert_eq!(status.prefetch.queue_size, 0);
        let report = status.performance.unwrap();
        assert_eq!(report.total_queries, 1);

        manager.cleanup();
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_monitoring_yields_no_report() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine, false);

        let status = manager.cache_status();
        assert!(status.performance.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_is_idempotent_and_stops_all_timers() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine, true);

        manager.sync_manager().start(&QueryKey::exam_detail("4"), 1_000);
        manager.sync_manager().start(&QueryKey::exam_detail("5"), 1_000);
        assert_eq!(manager.cache_status().sync.count, 2);

        manager.cleanup();
        assert_eq!(manager.cache_status().sync.count, 0);

        // Second cleanup on an already clean manager.
        manager.cleanup();
        assert_eq!(manager.cache_status().sync.count, 0);
    }

    #[tokio::test]
    async fn snapshot_serializes_for_observability_consumers() {
        let engine = Arc::new(MockEngine::new());
        let manager = manager_with(engine, true);
        manager.record_query(&QueryKey::exam_detail("6"), 100.0, true, false);

        let json = serde_json::to_value(manager.cache_status()).unwrap();
        assert!(json.get("prefetch").is_some());
        assert!(json.get("sync").is_some());
        assert!(json.get("performance").is_some());
    }
}
