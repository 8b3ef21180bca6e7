//! Merge a ranked set with a candidate set from an independent query.

use std::collections::HashSet;

use super::selector::window;
use crate::models::EntityId;

/// Candidates that appear in `ranked`, minus `excluded`, in rank order,
/// windowed like [`select`](super::select).
///
/// The candidates' own order is discarded. Returns an empty list when
/// either side is empty; the caller then keeps its default ordering.
pub fn merge(
    ranked: &[EntityId],
    candidates: &HashSet<EntityId>,
    excluded: &HashSet<EntityId>,
    offset: i64,
    limit: i64,
) -> Vec<EntityId> {
    if ranked.is_empty() || candidates.is_empty() {
        return Vec::new();
    }

    let eligible: HashSet<EntityId> = candidates.difference(excluded).copied().collect();
    if eligible.is_empty() {
        return Vec::new();
    }

    let intersection: Vec<EntityId> = ranked
        .iter()
        .copied()
        .filter(|id| eligible.contains(id))
        .collect();

    window(&intersection, offset, limit)
}
