//! Per-entity lifetime view counters.

mod memory;
mod sqlite;
mod store;
mod updater;

pub use memory::InMemoryViewStore;
pub use sqlite::DieselViewStore;
pub use store::{StoreError, StoreResult, ViewStore, VIEWS_META_KEY};
pub use updater::{ReconcileOutcome, ReconcileSummary, ViewCountUpdater, DEFAULT_CONCURRENCY};
