//! Cache operation error types.
//!
//! Nothing in this crate is fatal to the host application. Speculative work
//! (prefetch, background revalidation, warming) catches these errors at the
//! point of issue and logs them instead of propagating.

/// Error raised by cache coordination operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheOperationError {
    /// A speculative prefetch could not be issued or completed.
    PrefetchFailed(String),
    /// The underlying fetch for a resource failed.
    FetchFailed(String),
    /// A background invalidation against the query engine failed.
    InvalidationFailed(String),
    /// The query engine rejected the call or is shutting down.
    EngineUnavailable(String),
    /// A component was constructed with an invalid or incomplete configuration.
    InvalidConfiguration(String),
    /// A key could not be interpreted by the coordinator.
    InvalidKey(String),
}

impl std::fmt::Display for CacheOperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheOperationError::PrefetchFailed(msg) => write!(f, "Prefetch failed: {}", msg),
            CacheOperationError::FetchFailed(msg) => write!(f, "Fetch failed: {}", msg),
            CacheOperationError::InvalidationFailed(msg) => {
                write!(f, "Invalidation failed: {}", msg)
            }
            CacheOperationError::EngineUnavailable(msg) => {
                write!(f, "Query engine unavailable: {}", msg)
            }
            CacheOperationError::InvalidConfiguration(msg) => {
                write!(f, "Invalid configuration: {}", msg)
            }
            CacheOperationError::InvalidKey(msg) => write!(f, "Invalid key: {}", msg),
        }
    }
}

impl std::error::Error for CacheOperationError {}

impl CacheOperationError {
    /// Create prefetch failure error
    #[inline]
    pub fn prefetch_failed(msg: impl Into<String>) -> Self {
        Self::PrefetchFailed(msg.into())
    }

    /// Create fetch failure error
    #[inline]
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    /// Create invalidation failure error
    #[inline]
    pub fn invalidation_failed(msg: impl Into<String>) -> Self {
        Self::InvalidationFailed(msg.into())
    }

    /// Create engine availability error
    #[inline]
    pub fn engine_unavailable(msg: impl Into<String>) -> Self {
        Self::EngineUnavailable(msg.into())
    }

    /// Create configuration error
    #[inline]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
