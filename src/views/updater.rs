//! Reconcile stored view counters with fresh provider counts.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::store::ViewStore;
use crate::models::{Capabilities, EntityId};
use crate::stats::BoxedStatsGateway;

/// Default number of reconciles in flight during a sweep.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// What happened to one entity's counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A larger fresh count was written.
    Updated { id: EntityId, views: u64 },
    /// Stored count already at least as large, or no fresh count.
    Unchanged { id: EntityId, views: u64 },
    /// Store or gateway failed; `views` is the best known count.
    Failed { id: EntityId, views: u64 },
}

impl ReconcileOutcome {
    pub fn id(&self) -> EntityId {
        match self {
            Self::Updated { id, .. } | Self::Unchanged { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    pub fn views(&self) -> u64 {
        match self {
            Self::Updated { views, .. }
            | Self::Unchanged { views, .. }
            | Self::Failed { views, .. } => *views,
        }
    }
}

/// Tally of a sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl ReconcileSummary {
    fn record(&mut self, outcome: &ReconcileOutcome) {
        match outcome {
            ReconcileOutcome::Updated { .. } => self.updated += 1,
            ReconcileOutcome::Unchanged { .. } => self.unchanged += 1,
            ReconcileOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.updated + self.unchanged + self.failed
    }
}

/// Brings stored counters up to the provider's lifetime counts.
///
/// Counters never decrease: a fresh count is written only when it beats the
/// stored one, and the write itself is conditional so racing reconciles
/// settle on the maximum.
pub struct ViewCountUpdater {
    gateway: BoxedStatsGateway,
    store: Arc<dyn ViewStore>,
    capabilities: Capabilities,
}

impl ViewCountUpdater {
    pub fn new(
        gateway: BoxedStatsGateway,
        store: Arc<dyn ViewStore>,
        capabilities: Capabilities,
    ) -> Self {
        Self {
            gateway,
            store,
            capabilities,
        }
    }

    /// Reconcile one entity and return the larger of stored and fresh counts.
    pub async fn reconcile(&self, id: EntityId) -> u64 {
        self.reconcile_outcome(id).await.views()
    }

    /// Reconcile one entity, reporting what happened.
    pub async fn reconcile_outcome(&self, id: EntityId) -> ReconcileOutcome {
        let mut failed = false;

        let stored = match self.store.get(id).await {
            Ok(views) => views,
            Err(e) => {
                warn!("Failed to read views for entity {}: {}", id, e);
                failed = true;
                0
            }
        };

        let fresh = if self.capabilities.stats {
            match self.gateway.fetch_entity_views(id).await {
                Ok(views) => views,
                Err(e) => {
                    warn!("Failed to fetch views for entity {}: {}", id, e);
                    failed = true;
                    None
                }
            }
        } else {
            None
        };

        let outcome = match fresh {
            Some(fresh) if fresh > stored => self.write(id, fresh).await,
            _ => ReconcileOutcome::Unchanged { id, views: stored },
        };

        match outcome {
            ReconcileOutcome::Unchanged { views, .. } if failed => {
                ReconcileOutcome::Failed { id, views }
            }
            other => other,
        }
    }

    async fn write(&self, id: EntityId, fresh: u64) -> ReconcileOutcome {
        match self.store.compare_and_set(id, fresh).await {
            Ok(true) => {
                debug!("Entity {} now at {} views", id, fresh);
                ReconcileOutcome::Updated { id, views: fresh }
            }
            // Someone else wrote a count at least as large.
            Ok(false) => match self.store.get(id).await {
                Ok(current) => ReconcileOutcome::Unchanged {
                    id,
                    views: current.max(fresh),
                },
                Err(e) => {
                    warn!("Failed to re-read views for entity {}: {}", id, e);
                    ReconcileOutcome::Failed { id, views: fresh }
                }
            },
            Err(e) => {
                warn!("Failed to store views for entity {}: {}", id, e);
                ReconcileOutcome::Failed { id, views: fresh }
            }
        }
    }

    /// Reconcile a page of entities with bounded concurrency, calling
    /// `progress` once per finished entity.
    pub async fn reconcile_many<F>(
        &self,
        ids: &[EntityId],
        concurrency: usize,
        progress: F,
    ) -> ReconcileSummary
    where
        F: Fn(&ReconcileOutcome),
    {
        let mut summary = ReconcileSummary::default();
        let mut outcomes = stream::iter(ids.iter().copied())
            .map(|id| self.reconcile_outcome(id))
            .buffer_unordered(concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            summary.record(&outcome);
            progress(&outcome);
        }

        debug!(
            "Reconciled {} entities: {} updated, {} unchanged, {} failed",
            summary.total(),
            summary.updated,
            summary.unchanged,
            summary.failed
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::stats::StaticStatsGateway;
    use crate::views::{InMemoryViewStore, StoreError, StoreResult};

    /// Loses every conditional write, then fails on the follow-up read.
    #[derive(Default)]
    struct LostRaceStore {
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ViewStore for LostRaceStore {
        async fn get(&self, _id: EntityId) -> StoreResult<u64> {
            match self.reads.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(10),
                _ => Err(StoreError::Database("database is locked".to_string())),
            }
        }

        async fn compare_and_set(&self, _id: EntityId, _views: u64) -> StoreResult<bool> {
            Ok(false)
        }

        async fn put(&self, _id: EntityId, _views: u64) -> StoreResult<()> {
            Ok(())
        }

        async fn entity_ids(&self, _offset: usize, _limit: usize) -> StoreResult<Vec<EntityId>> {
            Ok(Vec::new())
        }
    }

    fn updater(
        capabilities: Capabilities,
    ) -> (Arc<StaticStatsGateway>, Arc<InMemoryViewStore>, ViewCountUpdater) {
        let gateway = Arc::new(StaticStatsGateway::default());
        let store = Arc::new(InMemoryViewStore::new());
        let updater = ViewCountUpdater::new(gateway.clone(), store.clone(), capabilities);
        (gateway, store, updater)
    }

    #[tokio::test]
    async fn test_larger_fresh_count_is_written() {
        let (gateway, store, updater) = updater(Capabilities::all());
        store.put(EntityId(1), 40).await.unwrap();
        gateway.set_views(EntityId(1), 90);

        assert_eq!(updater.reconcile(EntityId(1)).await, 90);
        assert_eq!(store.get(EntityId(1)).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_counter_never_decreases() {
        let (gateway, store, updater) = updater(Capabilities::all());
        store.put(EntityId(1), 500).await.unwrap();
        gateway.set_views(EntityId(1), 120);

        assert_eq!(updater.reconcile(EntityId(1)).await, 500);
        assert_eq!(store.get(EntityId(1)).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent() {
        let (gateway, store, updater) = updater(Capabilities::all());
        gateway.set_views(EntityId(3), 75);

        let first = updater.reconcile_outcome(EntityId(3)).await;
        let second = updater.reconcile_outcome(EntityId(3)).await;
        assert_eq!(first, ReconcileOutcome::Updated { id: EntityId(3), views: 75 });
        assert_eq!(second, ReconcileOutcome::Unchanged { id: EntityId(3), views: 75 });
        assert_eq!(store.get(EntityId(3)).await.unwrap(), 75);
    }

    #[tokio::test]
    async fn test_gateway_failure_keeps_stored_value() {
        let (gateway, store, updater) = updater(Capabilities::all());
        store.put(EntityId(2), 33).await.unwrap();
        gateway.set_views(EntityId(2), 1000);
        gateway.set_failing(true);

        let outcome = updater.reconcile_outcome(EntityId(2)).await;
        assert_eq!(outcome, ReconcileOutcome::Failed { id: EntityId(2), views: 33 });
        assert_eq!(store.get(EntityId(2)).await.unwrap(), 33);
    }

    #[tokio::test]
    async fn test_failed_reread_after_lost_write_is_reported() {
        let gateway = Arc::new(StaticStatsGateway::default());
        gateway.set_views(EntityId(6), 90);
        let updater = ViewCountUpdater::new(
            gateway,
            Arc::new(LostRaceStore::default()),
            Capabilities::all(),
        );

        let outcome = updater.reconcile_outcome(EntityId(6)).await;
        assert_eq!(outcome, ReconcileOutcome::Failed { id: EntityId(6), views: 90 });
    }

    #[tokio::test]
    async fn test_missing_fresh_count_is_unchanged() {
        let (_gateway, store, updater) = updater(Capabilities::all());
        store.put(EntityId(4), 12).await.unwrap();
        assert_eq!(updater.reconcile(EntityId(4)).await, 12);
    }

    #[tokio::test]
    async fn test_stats_unavailable_skips_gateway() {
        let (gateway, store, updater) = updater(Capabilities::none());
        store.put(EntityId(5), 8).await.unwrap();
        gateway.set_views(EntityId(5), 800);

        assert_eq!(updater.reconcile(EntityId(5)).await, 8);
        assert_eq!(gateway.view_calls(), 0);
    }

    #[tokio::test]
    async fn test_reconcile_many_summarizes_and_reports_progress() {
        let (gateway, store, updater) = updater(Capabilities::all());
        store.put(EntityId(1), 100).await.unwrap();
        store.put(EntityId(2), 5).await.unwrap();
        gateway.set_views(EntityId(1), 50);
        gateway.set_views(EntityId(2), 60);
        gateway.set_views(EntityId(3), 70);

        let ticks = AtomicUsize::new(0);
        let ids = [EntityId(1), EntityId(2), EntityId(3)];
        let summary = updater
            .reconcile_many(&ids, 2, |_| {
                ticks.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(
            summary,
            ReconcileSummary {
                updated: 2,
                unchanged: 1,
                failed: 0
            }
        );
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(store.get(EntityId(3)).await.unwrap(), 70);
    }
}
