//! Marker arena - buffer positions that follow edits
//!
//! Markers are kept in a single vector sorted by offset. Edits rebase every
//! marker after the edit point, which never reorders them, so range queries
//! stay a pair of binary searches.

use std::ops::{Range, RangeInclusive};

/// Stable handle to a marker in a [`MarkerSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    offset: usize,
    id: MarkerId,
}

/// Ordered set of markers, rebased on every buffer edit
///
/// Rebasing rules:
/// - an insertion strictly before a marker shifts it forward
/// - an insertion exactly at a marker leaves it in place
/// - a deletion spanning a marker moves it to the deletion point
#[derive(Debug, Clone, Default)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    next_id: u64,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Create a marker at `offset`
    pub fn create(&mut self, offset: usize) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;

        let idx = self.markers.partition_point(|m| m.offset <= offset);
        self.markers.insert(idx, Marker { offset, id });
        id
    }

    /// Current offset of a marker (linear scan)
    pub fn offset(&self, id: MarkerId) -> Option<usize> {
        self.markers.iter().find(|m| m.id == id).map(|m| m.offset)
    }

    /// Remove a marker. Returns its last offset if it existed.
    pub fn remove(&mut self, id: MarkerId) -> Option<usize> {
        let idx = self.markers.iter().position(|m| m.id == id)?;
        Some(self.markers.remove(idx).offset)
    }

    /// Remove a marker whose offset is already known.
    ///
    /// Binary-searches to `offset` instead of scanning the whole arena.
    pub fn remove_at(&mut self, offset: usize, id: MarkerId) -> bool {
        let start = self.markers.partition_point(|m| m.offset < offset);
        let found = self.markers[start..]
            .iter()
            .take_while(|m| m.offset == offset)
            .position(|m| m.id == id);

        match found {
            Some(rel) => {
                self.markers.remove(start + rel);
                true
            }
            None => self.remove(id).is_some(),
        }
    }

    /// Markers whose offset falls within `range`, in offset order
    pub fn in_range(
        &self,
        range: RangeInclusive<usize>,
    ) -> impl Iterator<Item = (usize, MarkerId)> + '_ {
        let (lo, hi) = range.into_inner();
        let start = self.markers.partition_point(|m| m.offset < lo);
        let end = self.markers.partition_point(|m| m.offset <= hi);
        let slice = if start <= end {
            &self.markers[start..end]
        } else {
            &[]
        };
        slice.iter().map(|m| (m.offset, m.id))
    }

    /// All markers in offset order
    pub fn iter(&self) -> impl Iterator<Item = (usize, MarkerId)> + '_ {
        self.markers.iter().map(|m| (m.offset, m.id))
    }

    /// Rebase markers after `len` chars were inserted at `at`
    pub fn apply_insert(&mut self, at: usize, len: usize) {
        if len == 0 {
            return;
        }
        let first = self.markers.partition_point(|m| m.offset <= at);
        for marker in &mut self.markers[first..] {
            marker.offset += len;
        }
    }

    /// Rebase markers after the chars in `range` were removed
    pub fn apply_remove(&mut self, range: Range<usize>) {
        let removed = range.end.saturating_sub(range.start);
        if removed == 0 {
            return;
        }
        let first = self.markers.partition_point(|m| m.offset <= range.start);
        for marker in &mut self.markers[first..] {
            marker.offset = if marker.offset >= range.end {
                marker.offset - removed
            } else {
                range.start
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_stay_sorted_on_create() {
        let mut set = MarkerSet::new();
        set.create(10);
        set.create(2);
        set.create(5);
        let offsets: Vec<usize> = set.iter().map(|(o, _)| o).collect();
        assert_eq!(offsets, vec![2, 5, 10]);
    }

    #[test]
    fn test_insert_before_marker_shifts_it() {
        let mut set = MarkerSet::new();
        let id = set.create(4);
        set.apply_insert(1, 3);
        assert_eq!(set.offset(id), Some(7));
    }

    #[test]
    fn test_insert_at_marker_keeps_it() {
        let mut set = MarkerSet::new();
        let id = set.create(4);
        set.apply_insert(4, 3);
        assert_eq!(set.offset(id), Some(4));
    }

    #[test]
    fn test_insert_after_marker_keeps_it() {
        let mut set = MarkerSet::new();
        let id = set.create(4);
        set.apply_insert(5, 3);
        assert_eq!(set.offset(id), Some(4));
    }

    #[test]
    fn test_remove_spanning_marker_collapses_to_start() {
        let mut set = MarkerSet::new();
        let inside = set.create(4);
        let after = set.create(9);
        set.apply_remove(2..6);
        assert_eq!(set.offset(inside), Some(2));
        assert_eq!(set.offset(after), Some(5));
    }

    #[test]
    fn test_remove_ending_at_marker_moves_it_back() {
        let mut set = MarkerSet::new();
        let id = set.create(6);
        set.apply_remove(2..6);
        assert_eq!(set.offset(id), Some(2));
    }

    #[test]
    fn test_in_range_is_inclusive() {
        let mut set = MarkerSet::new();
        set.create(0);
        set.create(2);
        set.create(4);
        set.create(6);
        let found: Vec<usize> = set.in_range(2..=4).map(|(o, _)| o).collect();
        assert_eq!(found, vec![2, 4]);
    }

    #[test]
    fn test_in_range_with_inverted_bounds_is_empty() {
        let mut set = MarkerSet::new();
        set.create(3);
        assert_eq!(set.in_range(5..=1).count(), 0);
    }

    #[test]
    fn test_remove_at_with_duplicate_offsets() {
        let mut set = MarkerSet::new();
        let a = set.create(3);
        let b = set.create(3);
        assert!(set.remove_at(3, b));
        assert_eq!(set.offset(a), Some(3));
        assert_eq!(set.offset(b), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_at_falls_back_on_stale_offset() {
        let mut set = MarkerSet::new();
        let a = set.create(3);
        assert!(set.remove_at(7, a));
        assert!(set.is_empty());
    }
}
