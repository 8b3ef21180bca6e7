//! In-memory view store for single-process operation and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{StoreError, StoreResult, ViewStore};
use crate::models::EntityId;

/// Lock-based view store. State is not persisted across restarts.
#[derive(Debug, Default)]
pub struct InMemoryViewStore {
    counts: RwLock<BTreeMap<EntityId, u64>>,
}

impl InMemoryViewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing counters.
    pub fn with_counts(counts: impl IntoIterator<Item = (EntityId, u64)>) -> Self {
        Self {
            counts: RwLock::new(counts.into_iter().collect()),
        }
    }
}

#[async_trait]
impl ViewStore for InMemoryViewStore {
    async fn get(&self, id: EntityId) -> StoreResult<u64> {
        Ok(self.counts.read().await.get(&id).copied().unwrap_or(0))
    }

    async fn compare_and_set(&self, id: EntityId, views: u64) -> StoreResult<bool> {
        let mut counts = self.counts.write().await;
        let current = counts.get(&id).copied().unwrap_or(0);
        if views > current {
            counts.insert(id, views);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn put(&self, id: EntityId, views: u64) -> StoreResult<()> {
        if views == 0 {
            return Err(StoreError::ZeroViews);
        }
        self.counts.write().await.insert(id, views);
        Ok(())
    }

    async fn entity_ids(&self, offset: usize, limit: usize) -> StoreResult<Vec<EntityId>> {
        Ok(self
            .counts
            .read()
            .await
            .keys()
            .skip(offset)
            .take(limit)
            .copied()
            .collect())
    }
}
