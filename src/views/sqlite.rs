//! Diesel-backed view store for persistent counters.
//!
//! The conditional write is a single upsert whose update arm only fires
//! when the new count is larger, so concurrent reconciles converge on the
//! maximum without explicit locking.

use std::path::Path;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::store::{to_stored, StoreError, StoreResult, ViewStore};
use crate::models::EntityId;
use crate::repository::util::now_rfc3339;
use crate::repository::{init_schema, DbPool, EntityViewsRecord};
use crate::schema::entity_views;
use crate::with_conn;

const CONDITIONAL_UPSERT: &str = "INSERT INTO entity_views (entity_id, views, updated_at) \
     VALUES (?, ?, ?) \
     ON CONFLICT(entity_id) DO UPDATE SET views = excluded.views, updated_at = excluded.updated_at \
     WHERE excluded.views > entity_views.views";

/// Diesel-backed view store (SQLite).
#[derive(Debug, Clone)]
pub struct DieselViewStore {
    pool: DbPool,
}

impl DieselViewStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open the database at `path`, creating the schema if needed.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        let pool = DbPool::from_path(path);
        init_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Highest stored counters, largest first.
    pub async fn top(&self, limit: usize) -> StoreResult<Vec<(EntityId, u64)>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<EntityViewsRecord> = with_conn!(self.pool, conn => {
            entity_views::table
                .select(EntityViewsRecord::as_select())
                .order((entity_views::views.desc(), entity_views::entity_id.asc()))
                .limit(limit)
                .load(&mut conn)
                .await?
        });

        Ok(rows
            .into_iter()
            .map(|r| (EntityId(r.entity_id.max(0) as u64), r.views.max(0) as u64))
            .collect())
    }
}

#[async_trait]
impl ViewStore for DieselViewStore {
    async fn get(&self, id: EntityId) -> StoreResult<u64> {
        let entity_id = to_stored(id.get())?;
        let views: Option<i64> = with_conn!(self.pool, conn => {
            entity_views::table
                .find(entity_id)
                .select(entity_views::views)
                .first::<i64>(&mut conn)
                .await
                .optional()?
        });

        Ok(views.map(|v| v.max(0) as u64).unwrap_or(0))
    }

    async fn compare_and_set(&self, id: EntityId, views: u64) -> StoreResult<bool> {
        // A missing row counts as 0, which 0 never beats.
        if views == 0 {
            return Ok(false);
        }
        let entity_id = to_stored(id.get())?;
        let stored = to_stored(views)?;
        let now = now_rfc3339();

        let rows = with_conn!(self.pool, conn => {
            diesel::sql_query(CONDITIONAL_UPSERT)
                .bind::<BigInt, _>(entity_id)
                .bind::<BigInt, _>(stored)
                .bind::<Text, _>(now)
                .execute(&mut conn)
                .await?
        });

        if rows > 0 {
            debug!("Stored {} views for entity {}", views, id);
        }
        Ok(rows > 0)
    }

    async fn put(&self, id: EntityId, views: u64) -> StoreResult<()> {
        if views == 0 {
            return Err(StoreError::ZeroViews);
        }
        let entity_id = to_stored(id.get())?;
        let stored = to_stored(views)?;
        let now = now_rfc3339();

        with_conn!(self.pool, conn => {
            diesel::replace_into(entity_views::table)
                .values((
                    entity_views::entity_id.eq(entity_id),
                    entity_views::views.eq(stored),
                    entity_views::updated_at.eq(&now),
                ))
                .execute(&mut conn)
                .await?
        });
        debug!("Set {} views for entity {}", views, id);

        Ok(())
    }

    async fn entity_ids(&self, offset: usize, limit: usize) -> StoreResult<Vec<EntityId>> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let ids: Vec<i64> = with_conn!(self.pool, conn => {
            entity_views::table
                .select(entity_views::entity_id)
                .order(entity_views::entity_id.asc())
                .offset(offset)
                .limit(limit)
                .load(&mut conn)
                .await?
        });

        Ok(ids.into_iter().map(|id| EntityId(id.max(0) as u64)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store() -> (TempDir, DieselViewStore) {
        let dir = TempDir::new().unwrap();
        let store = DieselViewStore::open(&dir.path().join("views.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_missing_counter_reads_zero() {
        let (_dir, store) = store().await;
        assert_eq!(store.get(EntityId(42)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_compare_and_set_is_monotonic() {
        let (_dir, store) = store().await;
        let id = EntityId(42);

        assert!(store.compare_and_set(id, 100).await.unwrap());
        assert!(!store.compare_and_set(id, 100).await.unwrap());
        assert!(!store.compare_and_set(id, 60).await.unwrap());
        assert!(store.compare_and_set(id, 150).await.unwrap());
        assert_eq!(store.get(id).await.unwrap(), 150);
    }

    #[tokio::test]
    async fn test_compare_and_set_zero_writes_nothing() {
        let (_dir, store) = store().await;
        assert!(!store.compare_and_set(EntityId(1), 0).await.unwrap());
        assert!(store.entity_ids(0, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_rejects_zero() {
        let (_dir, store) = store().await;
        let id = EntityId(9);

        store.put(id, 500).await.unwrap();
        store.put(id, 20).await.unwrap();
        assert_eq!(store.get(id).await.unwrap(), 20);
        assert!(matches!(store.put(id, 0).await, Err(StoreError::ZeroViews)));
    }

    #[tokio::test]
    async fn test_entity_ids_and_top() {
        let (_dir, store) = store().await;
        store.put(EntityId(3), 30).await.unwrap();
        store.put(EntityId(1), 10).await.unwrap();
        store.put(EntityId(2), 20).await.unwrap();

        assert_eq!(
            store.entity_ids(1, 10).await.unwrap(),
            vec![EntityId(2), EntityId(3)]
        );
        assert_eq!(
            store.top(2).await.unwrap(),
            vec![(EntityId(3), 30), (EntityId(2), 20)]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_settle_on_maximum() {
        let (_dir, store) = store().await;
        let store = std::sync::Arc::new(store);
        let id = EntityId(1);

        let handles: Vec<_> = [50, 10, 90, 30, 70, 20, 80, 60]
            .into_iter()
            .map(|views| {
                let store = store.clone();
                tokio::spawn(async move { store.compare_and_set(id, views).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.get(id).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_counters_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("views.db");

        let store = DieselViewStore::open(&path).await.unwrap();
        store.compare_and_set(EntityId(5), 77).await.unwrap();
        drop(store);

        let store = DieselViewStore::open(&path).await.unwrap();
        assert_eq!(store.get(EntityId(5)).await.unwrap(), 77);
    }
}
