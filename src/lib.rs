//! Velocache - adaptive client-side caching and prefetching coordinator
//!
//! Velocache sits on top of an external keyed-query execution engine (which
//! already handles result storage, staleness windows, garbage collection and
//! deduplicated fetch execution) and decides, per resource key, how long
//! results stay fresh, when to fetch data before it is requested, when to
//! revalidate in the background, and whether those decisions are working.
//!
//! # Components
//!
//! - **Adaptive strategy engine**: per-key policy recommendations from
//!   threshold heuristics over recorded usage
//! - **Intelligent prefetcher**: deduplicated speculative fetches for
//!   visible-but-unopened records and upcoming list pages
//! - **Background sync manager**: per-key recurring revalidation timers
//! - **Cache warming coordinator**: best-effort startup prefetch batches
//! - **Performance monitor**: per-query recording with on-demand reports
//! - **Cache manager**: the orchestrator the application talks to
//!
//! Every failure mode in this crate degrades to "behaves as if the
//! optimization layer were absent"; speculative work is invisible to
//! correctness.

pub mod cache;
pub mod prelude;
pub mod telemetry;

// Re-export the public API at the crate root for convenience
pub use cache::engine::{CachePolicy, CachedEntry, InvalidationScope, QueryEngine, ResourceFetcher};
pub use cache::key::QueryKey;
pub use cache::manager::{CacheManager, CacheManagerBuilder};
pub use cache::strategy::CacheStrategy;
pub use prelude::*;
