//! Cache strategy presets and adaptive per-key strategy selection.
//!
//! The engine starts every key from the `dynamic` preset and perturbs it
//! with threshold-based heuristics fed by the metrics ledger.

use serde::{Deserialize, Serialize};

use super::key::QueryKey;
use super::metrics::{AccessFrequencyTracker, CacheMetrics, MetricsLedger, SLOW_QUERY_THRESHOLD_MS};
use crate::telemetry::types::PerformanceReport;

/// Family access count above which a resource family counts as hot.
const HOT_FAMILY_THRESHOLD: u64 = 10;

/// Hit rate below which a key is considered churning, in percent.
const LOW_HIT_RATE_PERCENT: f64 = 60.0;

/// Relative importance of keeping a resource fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachePriority {
    Critical = 1,
    Normal = 2,
    Low = 3,
}

/// Recommended caching policy for one resource key.
///
/// A recomputed value object, never persisted. The four presets are ordered
/// strictly by volatility so adaptive adjustments always move a key along
/// the same axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStrategy {
    pub priority: CachePriority,
    pub stale_time_ms: u64,
    pub gc_time_ms: u64,
    pub background_sync: bool,
    pub prefetch: bool,
}

impl CacheStrategy {
    /// Data that must track the server closely while on screen.
    pub const fn real_time() -> Self {
        Self {
            priority: CachePriority::Critical,
            stale_time_ms: 10_000,
            gc_time_ms: 60_000,
            background_sync: true,
            prefetch: false,
        }
    }

    /// Regularly changing data; the starting point for adaptive tuning.
    pub const fn dynamic() -> Self {
        Self {
            priority: CachePriority::Normal,
            stale_time_ms: 120_000,
            gc_time_ms: 300_000,
            background_sync: false,
            prefetch: true,
        }
    }

    /// Data that changes a few times per session.
    pub const fn stable() -> Self {
        Self {
            priority: CachePriority::Normal,
            stale_time_ms: 600_000,
            gc_time_ms: 1_800_000,
            background_sync: false,
            prefetch: true,
        }
    }

    /// Effectively immutable data.
    pub const fn static_content() -> Self {
        Self {
            priority: CachePriority::Low,
            stale_time_ms: 3_600_000,
            gc_time_ms: 86_400_000,
            background_sync: false,
            prefetch: false,
        }
    }
}

/// Produces a recommended caching policy per key from recorded usage.
#[derive(Debug, Default)]
pub struct AdaptiveStrategyEngine {
    ledger: MetricsLedger,
    frequency: AccessFrequencyTracker,
}

impl AdaptiveStrategyEngine {
    /// Create an engine with empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one settled query and bump the key family's access counter.
    pub fn record_query(&self, key: &QueryKey, response_time_ms: f64, is_hit: bool) {
        self.ledger.record(key, response_time_ms, is_hit, false);
        self.frequency.record(key.family());
    }

    /// Compute the recommended strategy for `key`.
    ///
    /// Starts from [`CacheStrategy::dynamic`] and applies three guarded
    /// adjustments, each multiplying whatever the windows currently are:
    ///
    /// 1. hot family: stale x1.5, gc x2, prefetch on
    /// 2. hit rate below 60%: stale x0.7, background sync on
    /// 3. average latency above the slow threshold: stale x1.3, gc x1.5
    ///
    /// The adjustments are cumulative and unclamped; a key matching all
    /// three can accumulate disproportionately long windows over repeated
    /// recomputation. That bias toward aggressive caching under any sign of
    /// cost or popularity is deliberate and kept without an upper bound.
    pub fn optimized_strategy(&self, key: &QueryKey) -> CacheStrategy {
        let mut strategy = CacheStrategy::dynamic();
        let mut stale_ms = strategy.stale_time_ms as f64;
        let mut gc_ms = strategy.gc_time_ms as f64;

        if self.frequency.count(key.family()) > HOT_FAMILY_THRESHOLD {
            stale_ms *= 1.5;
            gc_ms *= 2.0;
            strategy.prefetch = true;
        }

        if let Some(metrics) = self.ledger.metrics_for(key) {
            if metrics.hit_rate < LOW_HIT_RATE_PERCENT {
                stale_ms *= 0.7;
                strategy.background_sync = true;
            }
            if metrics.avg_response_time_ms > SLOW_QUERY_THRESHOLD_MS {
                stale_ms *= 1.3;
                gc_ms *= 1.5;
            }
        }

        // Single conversion at the end keeps the composed factors exact.
        strategy.stale_time_ms = stale_ms.round() as u64;
        strategy.gc_time_ms = gc_ms.round() as u64;
        strategy
    }

    /// Metrics snapshot for `key`, if any query was recorded for it.
    pub fn metrics_for(&self, key: &QueryKey) -> Option<CacheMetrics> {
        self.ledger.metrics_for(key)
    }

    /// Report over the engine's internal ledger.
    pub fn performance_report(&self) -> PerformanceReport {
        self.ledger.report()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_key_gets_the_unmodified_dynamic_preset() {
        let engine = AdaptiveStrategyEngine::new();
        let key = QueryKey::exam_detail("cold");

        assert_eq!(engine.optimized_strategy(&key), CacheStrategy::dynamic());
    }

    #[test]
    fn hot_family_extends_windows_and_forces_prefetch() {
        let engine = AdaptiveStrategyEngine::new();
        let key = QueryKey::exam_detail("hot");

        // Eleven hits keep the hit rate at 100% and latency low, so only
        // the family rule fires.
        for _ in 0..11 {
            engine.record_query(&key, 50.0, true);
        }

        let strategy = engine.optimized_strategy(&key);
        assert_eq!(strategy.stale_time_ms, 180_000);
        assert_eq!(strategy.gc_time_ms, 600_000);
        assert!(strategy.prefetch);
        assert!(!strategy.background_sync);
    }

    #[test]
    fn low_hit_rate_shortens_staleness_and_enables_sync() {
        let engine = AdaptiveStrategyEngine::new();
        let key = QueryKey::exam_detail("churny");

        engine.record_query(&key, 50.0, false);
        engine.record_query(&key, 50.0, false);

        let strategy = engine.optimized_strategy(&key);
        assert_eq!(strategy.stale_time_ms, 84_000);
        assert_eq!(strategy.gc_time_ms, 300_000);
        assert!(strategy.background_sync);
    }

    #[test]
    fn all_three_rules_compose_multiplicatively() {
        let engine = AdaptiveStrategyEngine::new();
        let key = QueryKey::exam_detail("worst-case");

        // Twelve slow misses: family count 12 > 10, hit rate 0% < 60%,
        // average latency 1500ms > 1000ms.
        for _ in 0..12 {
            engine.record_query(&key, 1500.0, false);
        }

        let strategy = engine.optimized_strategy(&key);
        let dynamic = CacheStrategy::dynamic();
        let expected_stale = (dynamic.stale_time_ms as f64 * 1.5 * 0.7 * 1.3).round() as u64;
        let expected_gc = (dynamic.gc_time_ms as f64 * 2.0 * 1.5).round() as u64;

        assert_eq!(strategy.stale_time_ms, expected_stale);
        assert_eq!(strategy.stale_time_ms, 163_800);
        assert_eq!(strategy.gc_time_ms, expected_gc);
        assert_eq!(strategy.gc_time_ms, 900_000);
        assert!(strategy.background_sync);
        assert!(strategy.prefetch);
    }

    #[test]
    fn presets_are_ordered_by_volatility() {
        assert!(CacheStrategy::real_time().stale_time_ms < CacheStrategy::dynamic().stale_time_ms);
        assert!(CacheStrategy::dynamic().stale_time_ms < CacheStrategy::stable().stale_time_ms);
        assert!(CacheStrategy::stable().stale_time_ms < CacheStrategy::static_content().stale_time_ms);
    }
}
