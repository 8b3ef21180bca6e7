//! Ordering instructions for a host query executor.
//!
//! The host asks for an ordering ("trending", "views", or its own default)
//! and supplies the candidate IDs its filters match. The answer is either
//! an explicit ID order, a sort on the stored view counter, or an
//! instruction to keep the default ordering along with the reason.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::cache::TrendingCache;
use super::merge::merge;
use super::selector::select;
use crate::config::TrendingConfig;
use crate::models::{EntityId, TrendingSet};
use crate::views::VIEWS_META_KEY;

/// Default upper bound for candidate-set queries.
pub const DEFAULT_CANDIDATE_POOL: usize = 500;

/// Source of the unordered IDs matching the host's filters.
#[async_trait]
pub trait CandidateSupplier: Send + Sync {
    /// At most `max` IDs; order is irrelevant.
    async fn candidate_ids(&self, max: usize) -> Vec<EntityId>;
}

#[async_trait]
impl CandidateSupplier for Vec<EntityId> {
    async fn candidate_ids(&self, max: usize) -> Vec<EntityId> {
        self.iter().take(max).copied().collect()
    }
}

/// Ordering the host asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OrderBy {
    /// Rank by the trending set.
    Trending,
    /// Sort by the stored lifetime view counter.
    Views,
    /// Host's own ordering.
    Default,
}

/// Why no ranked ordering was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    NotRequested,
    StatsUnavailable,
    EmptyTrendingSet,
    EmptyCandidateSet,
    NoOverlap,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotRequested => "not_requested",
            Self::StatsUnavailable => "stats_unavailable",
            Self::EmptyTrendingSet => "empty_trending_set",
            Self::EmptyCandidateSet => "empty_candidate_set",
            Self::NoOverlap => "no_overlap",
        }
    }
}

/// Instruction handed to the query executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum QueryOrder {
    /// Return exactly these IDs in this order.
    ExplicitIds { ids: Vec<EntityId> },
    /// Sort numerically by the named per-entity counter.
    ByViewCount { meta_key: &'static str },
    /// Keep the executor's default ordering.
    Default { reason: FallbackReason },
}

impl QueryOrder {
    fn fallback(reason: FallbackReason) -> Self {
        QueryOrder::Default { reason }
    }
}

/// Parameters of one trending request.
#[derive(Debug, Clone)]
pub struct TrendingRequest {
    pub window_days: i64,
    pub entity_types: Vec<String>,
    pub excluded: HashSet<EntityId>,
    pub offset: i64,
    pub limit: i64,
    pub use_cache: bool,
}

impl TrendingRequest {
    /// Request using configured window and types, 12 per page.
    pub fn from_config(config: &TrendingConfig) -> Self {
        Self {
            window_days: i64::from(config.window_days),
            entity_types: config.entity_types.clone(),
            excluded: HashSet::new(),
            offset: 0,
            limit: 12,
            use_cache: true,
        }
    }
}

/// Composes the trending cache and merger for query executors.
pub struct TrendingQuery {
    cache: Arc<TrendingCache>,
    candidate_pool: usize,
}

impl TrendingQuery {
    pub fn new(cache: Arc<TrendingCache>) -> Self {
        Self {
            cache,
            candidate_pool: DEFAULT_CANDIDATE_POOL,
        }
    }

    pub fn with_candidate_pool(mut self, candidate_pool: usize) -> Self {
        self.candidate_pool = candidate_pool.max(1);
        self
    }

    /// Standalone "top N": the windowed trending set.
    pub async fn top(&self, request: &TrendingRequest) -> TrendingSet {
        let set = self
            .cache
            .get_trending(request.window_days, &request.entity_types, request.use_cache)
            .await;
        select(&set, request.offset, request.limit)
    }

    /// Decide how the executor should order a page of results.
    pub async fn order_for(
        &self,
        order_by: OrderBy,
        request: &TrendingRequest,
        supplier: &dyn CandidateSupplier,
    ) -> QueryOrder {
        match order_by {
            OrderBy::Default => QueryOrder::fallback(FallbackReason::NotRequested),
            OrderBy::Views => {
                if self.cache.capabilities().stats {
                    QueryOrder::ByViewCount {
                        meta_key: VIEWS_META_KEY,
                    }
                } else {
                    QueryOrder::fallback(FallbackReason::StatsUnavailable)
                }
            }
            OrderBy::Trending => {
                if !self.cache.capabilities().stats {
                    return QueryOrder::fallback(FallbackReason::StatsUnavailable);
                }

                let ranked = self
                    .cache
                    .get_trending(request.window_days, &request.entity_types, request.use_cache)
                    .await;
                if ranked.is_empty() {
                    return QueryOrder::fallback(FallbackReason::EmptyTrendingSet);
                }

                let candidates: HashSet<EntityId> = supplier
                    .candidate_ids(self.candidate_pool)
                    .await
                    .into_iter()
                    .collect();
                order_candidates(&ranked, &candidates, request)
            }
        }
    }
}

/// Merge an already-fetched ranking with candidates into an instruction.
pub fn order_candidates(
    ranked: &[EntityId],
    candidates: &HashSet<EntityId>,
    request: &TrendingRequest,
) -> QueryOrder {
    if ranked.is_empty() {
        return QueryOrder::fallback(FallbackReason::EmptyTrendingSet);
    }
    if candidates.iter().all(|id| request.excluded.contains(id)) {
        return QueryOrder::fallback(FallbackReason::EmptyCandidateSet);
    }

    let ids = merge(
        ranked,
        candidates,
        &request.excluded,
        request.offset,
        request.limit,
    );
    if ids.is_empty() {
        debug!(
            "No overlap between {} ranked and {} candidate IDs",
            ranked.len(),
            candidates.len()
        );
        return QueryOrder::fallback(FallbackReason::NoOverlap);
    }

    QueryOrder::ExplicitIds { ids }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capabilities, RankedEntry};
    use crate::stats::StaticStatsGateway;

    fn ids(raw: &[u64]) -> Vec<EntityId> {
        raw.iter().copied().map(EntityId).collect()
    }

    fn query(capabilities: Capabilities) -> (Arc<StaticStatsGateway>, TrendingQuery) {
        let gateway = Arc::new(StaticStatsGateway::new(vec![
            RankedEntry::new(5, "post", 50),
            RankedEntry::new(3, "post", 30),
            RankedEntry::new(9, "post", 20),
            RankedEntry::new(1, "post", 10),
        ]));
        let cache = Arc::new(TrendingCache::new(gateway.clone(), capabilities));
        (gateway, TrendingQuery::new(cache))
    }

    fn request() -> TrendingRequest {
        TrendingRequest {
            window_days: 7,
            entity_types: vec!["post".to_string()],
            excluded: HashSet::new(),
            offset: 0,
            limit: 10,
            use_cache: true,
        }
    }

    #[tokio::test]
    async fn test_trending_order_merges_candidates() {
        let (_, query) = query(Capabilities::all());
        let mut request = request();
        request.excluded.insert(EntityId(1));

        let order = query
            .order_for(OrderBy::Trending, &request, &ids(&[1, 9, 3]))
            .await;
        assert_eq!(order, QueryOrder::ExplicitIds { ids: ids(&[3, 9]) });
    }

    #[tokio::test]
    async fn test_candidate_pool_bounds_supplier() {
        let (_, query) = query(Capabilities::all());
        let query = query.with_candidate_pool(1);

        // Only the first candidate (9) is fetched.
        let order = query
            .order_for(OrderBy::Trending, &request(), &ids(&[9, 3]))
            .await;
        assert_eq!(order, QueryOrder::ExplicitIds { ids: ids(&[9]) });
    }

    #[tokio::test]
    async fn test_fallback_reasons() {
        let (gateway, query) = query(Capabilities::all());

        let order = query
            .order_for(OrderBy::Trending, &request(), &Vec::new())
            .await;
        assert_eq!(
            order,
            QueryOrder::Default {
                reason: FallbackReason::EmptyCandidateSet
            }
        );

        let order = query
            .order_for(OrderBy::Trending, &request(), &ids(&[100, 200]))
            .await;
        assert_eq!(
            order,
            QueryOrder::Default {
                reason: FallbackReason::NoOverlap
            }
        );

        gateway.set_failing(true);
        let mut fresh = request();
        fresh.use_cache = false;
        fresh.window_days = 3;
        let order = query
            .order_for(OrderBy::Trending, &fresh, &ids(&[5]))
            .await;
        assert_eq!(
            order,
            QueryOrder::Default {
                reason: FallbackReason::EmptyTrendingSet
            }
        );
    }

    #[tokio::test]
    async fn test_views_order_uses_counter_key() {
        let (_, query) = query(Capabilities::all());
        let order = query
            .order_for(OrderBy::Views, &request(), &Vec::new())
            .await;
        assert_eq!(
            order,
            QueryOrder::ByViewCount {
                meta_key: VIEWS_META_KEY
            }
        );
    }

    #[tokio::test]
    async fn test_stats_unavailable_falls_back() {
        let (gateway, query) = query(Capabilities::none());
        for order_by in [OrderBy::Views, OrderBy::Trending] {
            let order = query.order_for(order_by, &request(), &ids(&[5])).await;
            assert_eq!(
                order,
                QueryOrder::Default {
                    reason: FallbackReason::StatsUnavailable
                }
            );
        }
        assert_eq!(gateway.top_calls(), 0);
    }

    #[tokio::test]
    async fn test_default_order_is_untouched() {
        let (gateway, query) = query(Capabilities::all());
        let order = query
            .order_for(OrderBy::Default, &request(), &ids(&[5]))
            .await;
        assert_eq!(
            order,
            QueryOrder::Default {
                reason: FallbackReason::NotRequested
            }
        );
        assert_eq!(gateway.top_calls(), 0);
    }

    #[test]
    fn test_fallback_reason_names_match_serialized_form() {
        for reason in [
            FallbackReason::NotRequested,
            FallbackReason::StatsUnavailable,
            FallbackReason::EmptyTrendingSet,
            FallbackReason::EmptyCandidateSet,
            FallbackReason::NoOverlap,
        ] {
            assert_eq!(
                serde_json::to_value(reason).unwrap(),
                serde_json::Value::from(reason.as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_top_windows_trending_set() {
        let (_, query) = query(Capabilities::all());
        let mut request = request();
        request.limit = 1;
        assert_eq!(query.top(&request).await, ids(&[5, 3]));
    }
}
