//! Pluggable storage for per-entity view counters.
//!
//! Counters default to 0 and only move upward through
//! [`ViewStore::compare_and_set`]. [`ViewStore::put`] is the explicit
//! external write path.

use async_trait::async_trait;

use crate::models::EntityId;

/// Well-known name of the lifetime view counter.
pub const VIEWS_META_KEY: &str = "mai_views";

/// Result type for view store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from view store backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("View count must be positive")]
    ZeroViews,
    #[error("View count {0} is out of range")]
    OutOfRange(u64),
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Trait for view counter storage backends.
///
/// Implementations must be thread-safe and handle concurrent access.
#[async_trait]
pub trait ViewStore: Send + Sync {
    /// Stored count, 0 when the entity has none.
    async fn get(&self, id: EntityId) -> StoreResult<u64>;

    /// Write `views` only if it is strictly greater than the stored count.
    /// Returns whether the write happened.
    async fn compare_and_set(&self, id: EntityId, views: u64) -> StoreResult<bool>;

    /// Overwrite the stored count. Rejects 0.
    async fn put(&self, id: EntityId, views: u64) -> StoreResult<()>;

    /// Page of known entity IDs in ascending order.
    async fn entity_ids(&self, offset: usize, limit: usize) -> StoreResult<Vec<EntityId>>;
}

/// Convert a count for signed storage columns.
pub(crate) fn to_stored(views: u64) -> StoreResult<i64> {
    i64::try_from(views).map_err(|_| StoreError::OutOfRange(views))
}
