//! Report types produced by the performance monitoring subsystem.

use std::time::SystemTime;

use serde::Serialize;

/// On-demand performance report across all recorded keys.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceReport {
    /// Hit rate across every key, as a percentage of total queries.
    pub overall_hit_rate: f64,
    /// Total queries recorded across every key.
    pub total_queries: u64,
    /// Keys whose average latency exceeds the slow-query threshold,
    /// slowest first, at most five.
    pub slow_queries: Vec<SlowQuery>,
    /// Keys that have recorded at least one error, highest error rate
    /// first, at most five.
    pub error_prone_queries: Vec<ErrorProneQuery>,
    /// When this report was generated.
    pub generated_at: SystemTime,
}

/// A key whose average response time exceeds the slow-query threshold.
#[derive(Debug, Clone, Serialize)]
pub struct SlowQuery {
    pub key: String,
    pub avg_response_time_ms: f64,
    pub total_queries: u64,
}

/// A key with recorded errors, ranked by error rate.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorProneQuery {
    pub key: String,
    pub error_rate: f64,
    pub error_count: u64,
}
