//! Time-boxed cache of trending sets.
//!
//! Entries are keyed by (clamped window, normalized type set) and replaced
//! wholesale on the next miss after they expire. Concurrent misses for the
//! same key may both reach the gateway; the last writer wins.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::TrendingConfig;
use crate::models::{Capabilities, EntityType, RankedEntry, TrendingSet};
use crate::stats::BoxedStatsGateway;

/// Default TTL for cached trending sets (10 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Default cap on entries requested from the gateway.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Longest trailing window the cache will ask for.
pub const MAX_WINDOW_DAYS: u32 = 30;

/// Expired entries are swept once the map grows past this.
const PRUNE_THRESHOLD: usize = 256;

/// Clamp a requested window to `1..=MAX_WINDOW_DAYS`.
pub fn clamp_window(window_days: i64) -> u32 {
    window_days.clamp(1, MAX_WINDOW_DAYS as i64) as u32
}

/// Cache key: clamped window plus lowercased, sorted, de-duplicated types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    window_days: u32,
    entity_types: Vec<EntityType>,
}

impl CacheKey {
    pub fn new<S: AsRef<str>>(window_days: i64, entity_types: &[S]) -> Self {
        let mut types: Vec<EntityType> = entity_types
            .iter()
            .map(|t| EntityType::new(t.as_ref()))
            .filter(|t| !t.as_str().is_empty())
            .collect();
        types.sort();
        types.dedup();

        Self {
            window_days: clamp_window(window_days),
            entity_types: types,
        }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn entity_types(&self) -> &[EntityType] {
        &self.entity_types
    }

    /// An empty type set admits every type.
    fn admits(&self, entity_type: &EntityType) -> bool {
        self.entity_types.is_empty() || self.entity_types.binary_search(entity_type).is_ok()
    }
}

/// A cached value with expiration time.
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn get(&self) -> Option<T> {
        if self.is_expired() {
            None
        } else {
            Some(self.value.clone())
        }
    }
}

/// Trending sets cached per key in front of a stats gateway.
pub struct TrendingCache {
    gateway: BoxedStatsGateway,
    entries: RwLock<HashMap<CacheKey, CacheEntry<TrendingSet>>>,
    ttl: Duration,
    max_entries: usize,
    capabilities: Capabilities,
}

impl TrendingCache {
    /// Create a cache with default TTL and entry cap.
    pub fn new(gateway: BoxedStatsGateway, capabilities: Capabilities) -> Self {
        Self {
            gateway,
            entries: RwLock::new(HashMap::new()),
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            capabilities,
        }
    }

    /// Create a cache from the `trending` config section.
    pub fn from_config(
        gateway: BoxedStatsGateway,
        config: &TrendingConfig,
        capabilities: Capabilities,
    ) -> Self {
        Self::new(gateway, capabilities)
            .with_ttl(config.cache_ttl())
            .with_max_entries(config.max_entries)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Ranked entity IDs for the window and type set.
    ///
    /// Never fails: on a gateway error the last stored set for the key is
    /// returned even if it has expired, otherwise an empty set.
    pub async fn get_trending<S: AsRef<str>>(
        &self,
        window_days: i64,
        entity_types: &[S],
        use_cache: bool,
    ) -> TrendingSet {
        if !self.capabilities.stats {
            debug!("Stats unavailable, no trending set");
            return TrendingSet::new();
        }

        let key = CacheKey::new(window_days, entity_types);

        if use_cache {
            if let Some(hit) = self.lookup(&key) {
                debug!("Trending cache hit for {:?}", key);
                return hit;
            }
        }

        debug!("Trending cache miss for {:?}, fetching", key);
        match self
            .gateway
            .fetch_top_entities(self.max_entries, key.window_days)
            .await
        {
            Ok(entries) => {
                let set = self.rank(&key, entries);
                self.store(key, set.clone());
                set
            }
            Err(e) => {
                let stale = self.stale(&key);
                warn!(
                    "Trending fetch failed ({}); serving {}",
                    e,
                    if stale.is_some() { "stale set" } else { "empty set" }
                );
                stale.unwrap_or_default()
            }
        }
    }

    /// Drop every cached set.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entries.write() {
            guard.clear();
        }
    }

    /// Number of keys currently held (live or expired).
    pub fn len(&self) -> usize {
        self.entries.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Filter to admitted types, keep provider order, drop repeats, cap.
    fn rank(&self, key: &CacheKey, entries: Vec<RankedEntry>) -> TrendingSet {
        let mut seen = HashSet::new();
        entries
            .into_iter()
            .filter(|entry| key.admits(&entry.entity_type))
            .map(|entry| entry.id)
            .filter(|id| seen.insert(*id))
            .take(self.max_entries)
            .collect()
    }

    fn lookup(&self, key: &CacheKey) -> Option<TrendingSet> {
        self.entries
            .read()
            .ok()
            .and_then(|guard| guard.get(key).and_then(|e| e.get()))
    }

    fn stale(&self, key: &CacheKey) -> Option<TrendingSet> {
        self.entries
            .read()
            .ok()
            .and_then(|guard| guard.get(key).map(|e| e.value.clone()))
    }

    fn store(&self, key: CacheKey, set: TrendingSet) {
        if let Ok(mut guard) = self.entries.write() {
            guard.insert(key, CacheEntry::new(set, self.ttl));
            if guard.len() > PRUNE_THRESHOLD {
                guard.retain(|_, entry| !entry.is_expired());
            }
        }
    }
}
