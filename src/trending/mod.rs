//! Trending sets: caching, selection, and merging with host queries.

mod cache;
mod merge;
mod query;
mod selector;

pub use cache::{
    clamp_window, CacheKey, TrendingCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL, MAX_WINDOW_DAYS,
};
pub use merge::merge;
pub use query::{
    order_candidates, CandidateSupplier, FallbackReason, OrderBy, QueryOrder, TrendingQuery,
    TrendingRequest, DEFAULT_CANDIDATE_POOL,
};
pub use selector::{select, window};
