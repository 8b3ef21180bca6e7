//! Offset/number windowing over ranked lists.
//!
//! The window starts at `offset - 1` (never below 0) and holds up to
//! `number + 1` items. Hosts paginate with this convention, so it is kept
//! as-is: offset 0 and offset 1 both start at the first item, and asking
//! for 12 can yield 13.

use crate::models::TrendingSet;

/// Slice `items` with the inclusive windowing convention described above.
/// Negative inputs are treated as zero.
pub fn window<T: Clone>(items: &[T], offset: i64, number: i64) -> Vec<T> {
    let start = offset.max(0).saturating_sub(1) as usize;
    let count = (number.max(0) as usize).saturating_add(1);
    items.iter().skip(start).take(count).cloned().collect()
}

/// Standalone "top N" selection from a trending set.
pub fn select(set: &TrendingSet, offset: i64, number: i64) -> TrendingSet {
    window(set, offset, number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityId;

    fn set(n: u64) -> TrendingSet {
        (1..=n).map(EntityId).collect()
    }

    #[test]
    fn test_offset_zero_returns_number_plus_one() {
        let selected = select(&set(20), 0, 12);
        assert_eq!(selected.len(), 13);
        assert_eq!(selected[0], EntityId(1));
        assert_eq!(selected[12], EntityId(13));
    }

    #[test]
    fn test_offset_one_also_starts_at_first_item() {
        assert_eq!(select(&set(20), 1, 3), select(&set(20), 0, 3));
    }

    #[test]
    fn test_offset_is_shifted_back_by_one() {
        let selected = select(&set(20), 5, 2);
        assert_eq!(selected, vec![EntityId(5), EntityId(6), EntityId(7)]);
    }

    #[test]
    fn test_short_set_returns_what_is_available() {
        assert_eq!(select(&set(3), 0, 12).len(), 3);
        assert!(select(&set(3), 10, 12).is_empty());
    }

    #[test]
    fn test_negative_inputs_clamp_to_zero() {
        assert_eq!(select(&set(5), -3, -1), vec![EntityId(1)]);
    }
}
