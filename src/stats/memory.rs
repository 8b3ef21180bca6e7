//! Static in-process stats gateway.
//!
//! Serves a fixed report from memory. Used for offline runs against a JSON
//! fixture and as the controllable gateway in tests (call counters, forced
//! failures).

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Deserialize;

use super::backend::{StatsError, StatsGateway, StatsResult};
use crate::models::{EntityId, RankedEntry};

/// On-disk fixture format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsFixture {
    /// Top entities, most viewed first.
    #[serde(default)]
    pub top: Vec<RankedEntry>,
    /// Per-entity lifetime view counts.
    #[serde(default)]
    pub views: HashMap<u64, u64>,
}

/// In-memory gateway.
#[derive(Debug, Default)]
pub struct StaticStatsGateway {
    top: RwLock<Vec<RankedEntry>>,
    views: RwLock<HashMap<EntityId, u64>>,
    failing: AtomicBool,
    top_calls: AtomicUsize,
    view_calls: AtomicUsize,
    last_window: AtomicUsize,
}

impl StaticStatsGateway {
    /// Create a gateway serving `top` as its ranked report.
    pub fn new(top: Vec<RankedEntry>) -> Self {
        Self {
            top: RwLock::new(top),
            ..Default::default()
        }
    }

    /// Create a gateway from a parsed fixture.
    pub fn from_fixture(fixture: StatsFixture) -> Self {
        let gateway = Self::new(fixture.top);
        for (id, views) in fixture.views {
            gateway.set_views(EntityId(id), views);
        }
        gateway
    }

    /// Load a JSON fixture file.
    pub fn from_fixture_path(path: &Path) -> Result<Self, StatsError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StatsError::Unavailable(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let fixture: StatsFixture = serde_json::from_str(&contents)
            .map_err(|e| StatsError::MalformedResponse(e.to_string()))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Replace the ranked report.
    pub fn set_top(&self, top: Vec<RankedEntry>) {
        if let Ok(mut guard) = self.top.write() {
            *guard = top;
        }
    }

    /// Set the lifetime view count for one entity.
    pub fn set_views(&self, id: EntityId, views: u64) {
        if let Ok(mut guard) = self.views.write() {
            guard.insert(id, views);
        }
    }

    /// Make every call fail with [`StatsError::Unavailable`] until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `fetch_top_entities` calls served (including failed ones).
    pub fn top_calls(&self) -> usize {
        self.top_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_entity_views` calls served (including failed ones).
    pub fn view_calls(&self) -> usize {
        self.view_calls.load(Ordering::SeqCst)
    }

    /// Window passed to the most recent `fetch_top_entities` call.
    pub fn last_window(&self) -> u32 {
        self.last_window.load(Ordering::SeqCst) as u32
    }

    fn check_available(&self) -> StatsResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StatsError::Unavailable("static gateway set to fail".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatsGateway for StaticStatsGateway {
    async fn fetch_top_entities(
        &self,
        max_count: usize,
        window_days: u32,
    ) -> StatsResult<Vec<RankedEntry>> {
        self.top_calls.fetch_add(1, Ordering::SeqCst);
        self.last_window.store(window_days as usize, Ordering::SeqCst);
        self.check_available()?;

        let top = self
            .top
            .read()
            .map_err(|_| StatsError::Unavailable("report lock poisoned".to_string()))?;
        Ok(top.iter().take(max_count).cloned().collect())
    }

    async fn fetch_entity_views(&self, id: EntityId) -> StatsResult<Option<u64>> {
        self.view_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let views = self
            .views
            .read()
            .map_err(|_| StatsError::Unavailable("views lock poisoned".to_string()))?;
        Ok(views.get(&id).copied())
    }

    async fn probe(&self) -> bool {
        !self.failing.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_top_respects_max_count() {
        let gateway = StaticStatsGateway::new(vec![
            RankedEntry::new(1, "post", 30),
            RankedEntry::new(2, "post", 20),
            RankedEntry::new(3, "page", 10),
        ]);

        let top = gateway.fetch_top_entities(2, 7).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, EntityId(1));
        assert_eq!(gateway.top_calls(), 1);
        assert_eq!(gateway.last_window(), 7);
    }

    #[tokio::test]
    async fn test_failing_gateway() {
        let gateway = StaticStatsGateway::default();
        gateway.set_failing(true);

        assert!(gateway.fetch_top_entities(10, 1).await.is_err());
        assert!(gateway.fetch_entity_views(EntityId(1)).await.is_err());
        assert!(!gateway.probe().await);
        assert_eq!(gateway.view_calls(), 1);
    }

    #[test]
    fn test_fixture_parsing() {
        let fixture: StatsFixture = serde_json::from_str(
            r#"{"top": [{"id": 9, "type": "post", "views": 4}], "views": {"9": 120}}"#,
        )
        .unwrap();
        let gateway = StaticStatsGateway::from_fixture(fixture);
        let views = gateway.views.read().unwrap();
        assert_eq!(views.get(&EntityId(9)), Some(&120));
    }
}
