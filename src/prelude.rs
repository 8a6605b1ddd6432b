//! Velocache prelude - convenient imports for users
//!
//! This module provides everything callers need to wire the coordinator
//! into an application.

// Re-export the public API
pub use crate::cache::manager::{
    CacheManager, CacheManagerBuilder, CacheStatusSnapshot, InitializeOptions,
};

// Re-export essential error types that users might need
pub use crate::cache::error::CacheOperationError;

// Re-export the collaborator seams callers implement
pub use crate::cache::engine::{
    CachePolicy, CachedEntry, FetchFn, FetchFuture, InvalidationScope, QueryEngine,
    ResourceFetcher,
};

// Re-export the per-component surfaces reachable through the manager
pub use crate::cache::key::QueryKey;
pub use crate::cache::prefetch::{IntelligentPrefetcher, PrefetcherStatus};
pub use crate::cache::strategy::{AdaptiveStrategyEngine, CachePriority, CacheStrategy};
pub use crate::cache::sync::{BackgroundSyncManager, SyncStatus};
pub use crate::cache::warming::{CacheWarmingCoordinator, WarmingOptions, WarmingStats};
pub use crate::telemetry::monitor::PerformanceMonitor;
pub use crate::telemetry::types::{ErrorProneQuery, PerformanceReport, SlowQuery};
