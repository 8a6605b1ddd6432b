//! Per-key usage statistics and access-frequency accounting.
//!
//! The ledger is pure keyed state with update functions. Recording never
//! fails and never reaches outside the process; monitoring must not affect
//! the monitored path.

use std::time::SystemTime;

use dashmap::DashMap;
use serde::Serialize;

use super::key::QueryKey;
use crate::telemetry::types::{ErrorProneQuery, PerformanceReport, SlowQuery};

/// Average latency above which a key counts as a slow query, in milliseconds.
pub(crate) const SLOW_QUERY_THRESHOLD_MS: f64 = 1000.0;

/// Maximum number of rows in each report section.
const REPORT_TOP_N: usize = 5;

/// Usage statistics for one resource key.
///
/// Created lazily on the first recorded query, updated on every subsequent
/// one, never deleted for the lifetime of the process. `hit_rate` is always
/// recomputed from `total_queries` and `miss_count`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheMetrics {
    pub total_queries: u64,
    pub miss_count: u64,
    /// Percentage in `[0, 100]`.
    pub hit_rate: f64,
    /// Running average over all recorded queries.
    pub avg_response_time_ms: f64,
    pub error_count: u64,
    pub last_error_at: Option<SystemTime>,
    pub last_updated: SystemTime,
}

impl CacheMetrics {
    fn new(now: SystemTime) -> Self {
        Self {
            total_queries: 0,
            miss_count: 0,
            hit_rate: 0.0,
            avg_response_time_ms: 0.0,
            error_count: 0,
            last_error_at: None,
            last_updated: now,
        }
    }
}

/// Keyed accumulator of per-resource usage statistics.
#[derive(Debug, Default)]
pub struct MetricsLedger {
    entries: DashMap<QueryKey, CacheMetrics>,
}

impl MetricsLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one settled query for `key`.
    pub fn record(&self, key: &QueryKey, response_time_ms: f64, is_hit: bool, has_error: bool) {
        let now = SystemTime::now();
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheMetrics::new(now));
        let metrics = entry.value_mut();

        metrics.total_queries += 1;
        if !is_hit {
            metrics.miss_count += 1;
        }
        metrics.hit_rate =
            (metrics.total_queries - metrics.miss_count) as f64 / metrics.total_queries as f64
                * 100.0;

        let n = metrics.total_queries as f64;
        metrics.avg_response_time_ms =
            (metrics.avg_response_time_ms * (n - 1.0) + response_time_ms) / n;

        if has_error {
            metrics.error_count += 1;
            metrics.last_error_at = Some(now);
        }
        metrics.last_updated = now;
    }

    /// Snapshot of the metrics for `key`, if any query was recorded for it.
    pub fn metrics_for(&self, key: &QueryKey) -> Option<CacheMetrics> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of keys with recorded metrics.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key has recorded metrics yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hit rate across every key, as a percentage. Zero when nothing has
    /// been recorded.
    pub fn overall_hit_rate(&self) -> f64 {
        let mut total = 0u64;
        let mut hits = 0u64;
        for entry in self.entries.iter() {
            let metrics = entry.value();
            total += metrics.total_queries;
            hits += metrics.total_queries - metrics.miss_count;
        }
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64 * 100.0
        }
    }

    /// Build the on-demand report: overall hit rate plus the worst keys by
    /// latency and by error rate.
    pub fn report(&self) -> PerformanceReport {
        let mut total = 0u64;
        let mut hits = 0u64;
        let mut slow_queries = Vec::new();
        let mut error_prone_queries = Vec::new();

        for entry in self.entries.iter() {
            let metrics = entry.value();
            total += metrics.total_queries;
            hits += metrics.total_queries - metrics.miss_count;

            if metrics.avg_response_time_ms > SLOW_QUERY_THRESHOLD_MS {
                slow_queries.push(SlowQuery {
                    key: entry.key().to_string(),
                    avg_response_time_ms: metrics.avg_response_time_ms,
                    total_queries: metrics.total_queries,
                });
            }
            if metrics.error_count > 0 {
                error_prone_queries.push(ErrorProneQuery {
                    key: entry.key().to_string(),
                    error_rate: metrics.error_count as f64 / metrics.total_queries as f64,
                    error_count: metrics.error_count,
                });
            }
        }

        slow_queries.sort_by(|a, b| b.avg_response_time_ms.total_cmp(&a.avg_response_time_ms));
        slow_queries.truncate(REPORT_TOP_N);
        error_prone_queries.sort_by(|a, b| b.error_rate.total_cmp(&a.error_rate));
        error_prone_queries.truncate(REPORT_TOP_N);

        PerformanceReport {
            overall_hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64 * 100.0
            },
            total_queries: total,
            slow_queries,
            error_prone_queries,
            generated_at: SystemTime::now(),
        }
    }

    /// Clear all recorded entries.
    pub fn reset(&self) {
        self.entries.clear();
    }
}

/// Per-family monotonic access counters.
///
/// A coarse popularity signal distinct from per-exact-key metrics: every
/// recorded query bumps the counter of the key's family.
#[derive(Debug, Default)]
pub struct AccessFrequencyTracker {
    counters: DashMap<String, u64>,
}

impl AccessFrequencyTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the counter for `family` and return the new count.
    pub fn record(&self, family: &str) -> u64 {
        let mut entry = self.counters.entry(family.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Current count for `family`.
    pub fn count(&self, family: &str) -> u64 {
        self.counters.get(family).map(|count| *count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> QueryKey {
        QueryKey::exam_detail(name)
    }

    #[test]
    fn hit_rate_is_consistent_with_counters() {
        let ledger = MetricsLedger::new();
        let k = key("1");

        ledger.record(&k, 100.0, true, false);
        ledger.record(&k, 100.0, false, false);
        ledger.record(&k, 100.0, true, false);
        ledger.record(&k, 100.0, false, false);

        let metrics = ledger.metrics_for(&k).unwrap();
        assert_eq!(metrics.total_queries, 4);
        assert_eq!(metrics.miss_count, 2);
        let expected =
            (metrics.total_queries - metrics.miss_count) as f64 / metrics.total_queries as f64
                * 100.0;
        assert!((metrics.hit_rate - expected).abs() < 1e-9);
        assert!((metrics.hit_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn average_latency_is_a_running_average() {
        let ledger = MetricsLedger::new();
        let k = key("2");

        ledger.record(&k, 100.0, true, false);
        ledger.record(&k, 200.0, true, false);
        ledger.record(&k, 600.0, true, false);

        let metrics = ledger.metrics_for(&k).unwrap();
        assert!((metrics.avg_response_time_ms - 300.0).abs() < 1e-9);
    }

    #[test]
    fn errors_are_counted_and_stamped() {
        let ledger = MetricsLedger::new();
        let k = key("3");

        ledger.record(&k, 100.0, false, true);
        ledger.record(&k, 100.0, true, false);

        let metrics = ledger.metrics_for(&k).unwrap();
        assert_eq!(metrics.error_count, 1);
        assert!(metrics.last_error_at.is_some());
    }

    #[test]
    fn report_ranks_slow_and_error_prone_keys() {
        let ledger = MetricsLedger::new();

        // Six slow keys, increasing latency; only the top five survive.
        for i in 0..6u64 {
            let k = key(&format!("slow-{i}"));
            ledger.record(&k, 1100.0 + i as f64 * 100.0, false, false);
        }
        // Fast key, never reported as slow.
        ledger.record(&key("fast"), 50.0, true, false);
        // Error-prone key.
        let failing = key("failing");
        ledger.record(&failing, 80.0, false, true);
        ledger.record(&failing, 80.0, true, false);

        let report = ledger.report();
        assert_eq!(report.slow_queries.len(), 5);
        assert_eq!(report.slow_queries[0].key, key("slow-5").to_string());
        assert!(
            report.slow_queries[0].avg_response_time_ms
                > report.slow_queries[4].avg_response_time_ms
        );
        assert!(!report.slow_queries.iter().any(|s| s.key.contains("fast")));

        assert_eq!(report.error_prone_queries.len(), 1);
        assert!((report.error_prone_queries[0].error_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_everything() {
        let ledger = MetricsLedger::new();
        ledger.record(&key("4"), 100.0, true, false);
        assert_eq!(ledger.len(), 1);

        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.report().total_queries, 0);
    }

    #[test]
    fn frequency_counts_per_family() {
        let tracker = AccessFrequencyTracker::new();
        assert_eq!(tracker.count("exam"), 0);

        tracker.record("exam");
        tracker.record("exam");
        tracker.record("statistics");

        assert_eq!(tracker.count("exam"), 2);
        assert_eq!(tracker.count("statistics"), 1);
    }
}
