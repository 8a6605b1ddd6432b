//! Query execution monitoring.

use crossbeam_utils::atomic::AtomicCell;

use super::types::PerformanceReport;
use crate::cache::key::QueryKey;
use crate::cache::metrics::MetricsLedger;

/// Records every query execution and produces on-demand reports.
///
/// Recording is infallible and a no-op while the monitor is disabled;
/// instrumentation must never affect the monitored path.
#[derive(Debug)]
pub struct PerformanceMonitor {
    ledger: MetricsLedger,
    enabled: AtomicCell<bool>,
    /// Overall hit rate as of the last recorded query, readable without
    /// touching the ledger.
    overall_hit_rate: AtomicCell<f64>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PerformanceMonitor {
    /// Create a monitor, enabled or disabled from the start.
    pub fn new(enabled: bool) -> Self {
        Self {
            ledger: MetricsLedger::new(),
            enabled: AtomicCell::new(enabled),
            overall_hit_rate: AtomicCell::new(0.0),
        }
    }

    /// Record one settled query execution.
    pub fn record_query_execution(
        &self,
        key: &QueryKey,
        response_time_ms: f64,
        is_hit: bool,
        has_error: bool,
    ) {
        if !self.enabled.load() {
            return;
        }
        self.ledger.record(key, response_time_ms, is_hit, has_error);
        self.overall_hit_rate.store(self.ledger.overall_hit_rate());
    }

    /// Build the current report.
    pub fn report(&self) -> PerformanceReport {
        self.ledger.report()
    }

    /// Overall hit rate as of the last recorded query, in percent.
    pub fn overall_hit_rate(&self) -> f64 {
        self.overall_hit_rate.load()
    }

    /// Toggle recording.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled);
    }

    /// Whether recording is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load()
    }

    /// Drop all recorded history.
    pub fn reset(&self) {
        self.ledger.reset();
        self.overall_hit_rate.store(0.0);
    }
}
