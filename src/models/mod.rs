//! Data models for postrank.

mod capabilities;
mod entity;

pub use capabilities::Capabilities;
pub use entity::{EntityId, EntityType, RankedEntry, TrendingSet};
