//! Configuration for the compound document resolver.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::endpoint::{EndpointRegistry, EndpointResolver};
use crate::types::ErrorStrategy;

/// Default maximum number of hops.
pub const DEFAULT_HOP_LIMIT: u32 = 5;

/// Default number of per-type fetches in flight within one hop.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Default timeout for a single batch fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable resolver settings.
///
/// Fetches run on the caller's tokio runtime; `max_concurrency` bounds how many
/// per-type fetches of one hop are in flight at once (1 means sequential).
#[derive(Clone)]
pub struct ResolverConfig {
    /// Maximum number of hops (fetch rounds) performed.
    pub hop_limit: u32,
    /// How a failed batch fetch is handled.
    pub error_strategy: ErrorStrategy,
    /// Width of the fetch pool. Zero is treated as one.
    pub max_concurrency: usize,
    /// Per-fetch timeout; a timeout counts as a fetch failure.
    pub fetch_timeout: Duration,
    /// Skip refetching `(type, id)` pairs already resolved in an earlier hop.
    pub memoize: bool,
    /// Source of per-type endpoints.
    pub endpoints: Arc<dyn EndpointResolver>,
}

impl ResolverConfig {
    /// Create a config with defaults around the given endpoint resolver.
    pub fn new(endpoints: Arc<dyn EndpointResolver>) -> Self {
        Self {
            hop_limit: DEFAULT_HOP_LIMIT,
            error_strategy: ErrorStrategy::default(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            memoize: true,
            endpoints,
        }
    }

    pub fn with_hop_limit(mut self, hop_limit: u32) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    pub fn with_error_strategy(mut self, error_strategy: ErrorStrategy) -> Self {
        self.error_strategy = error_strategy;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    /// Effective pool width, never below one.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(Arc::new(EndpointRegistry::new()))
    }
}

impl fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("hop_limit", &self.hop_limit)
            .field("error_strategy", &self.error_strategy)
            .field("max_concurrency", &self.max_concurrency)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("memoize", &self.memoize)
            .finish_non_exhaustive()
    }
}
