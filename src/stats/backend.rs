//! Pluggable gateway trait for the external stats provider.
//!
//! Allows swapping between the WordPress.com REST gateway and a static
//! in-process gateway (fixtures, offline runs, tests).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{EntityId, RankedEntry};

/// Result type for stats gateway operations.
pub type StatsResult<T> = Result<T, StatsError>;

/// Shared, type-erased gateway handle.
pub type BoxedStatsGateway = Arc<dyn StatsGateway>;

/// Errors from the stats provider.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Stats gateway unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed stats response: {0}")]
    MalformedResponse(String),
    #[error("Stats request timed out after {0:?}")]
    Timeout(Duration),
}

impl StatsError {
    /// Transport failures are worth retrying; a body we cannot decode is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StatsError::Unavailable(_) | StatsError::Timeout(_))
    }
}

/// Trait for stats providers.
///
/// Implementations must be thread-safe; the trending cache and the view
/// updater share one gateway across concurrent requests.
#[async_trait]
pub trait StatsGateway: Send + Sync {
    /// Top entities over the trailing `window_days`, most viewed first,
    /// at most `max_count` rows.
    async fn fetch_top_entities(
        &self,
        max_count: usize,
        window_days: u32,
    ) -> StatsResult<Vec<RankedEntry>>;

    /// Lifetime views for a single entity. `None` when the provider has no
    /// count for it.
    async fn fetch_entity_views(&self, id: EntityId) -> StatsResult<Option<u64>>;

    /// Cheap availability check, run once at startup.
    async fn probe(&self) -> bool {
        true
    }
}
