//! Color allocation for parallel-by fan-out.
//!
//! Every execution happens "at a color" — color 0 is the workflow's root
//! color. A `parallel_by` task allocates one contiguous range of fresh
//! colors per invocation (a `ColorGroup`), one color per element of the
//! array it split on, so sibling executions at different colors never
//! share state and a join can recognize when every color in a group has
//! reported.

use crate::error::{Error, Result};
use crate::node::NodeId;

pub type Color = i64;

/// A contiguous range `[begin, end)` of colors allocated by one
/// `parallel_by` task invocation, keyed by the color it was allocated at
/// (the "parent color" — the color the splitting task itself ran at).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorGroup {
    pub node_id: NodeId,
    pub parent_color: Color,
    pub begin: Color,
    pub end: Color,
}

impl ColorGroup {
    pub fn len(&self) -> i64 {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    pub fn contains(&self, color: Color) -> bool {
        color >= self.begin && color < self.end
    }

    /// Position of `color` within this group — the index into the
    /// parallel-by source array that color corresponds to.
    pub fn offset_of(&self, color: Color) -> Option<i64> {
        self.contains(color).then(|| color - self.begin)
    }
}

/// Allocates and resolves color groups for one workflow. The only mutable
/// state is the next-color counter; everything else is a pure lookup over
/// previously allocated groups, mirroring `get_split_size`/color-group
/// creation being idempotent once a group exists for a given (node, color).
#[derive(Debug, Default)]
pub struct ColorStore {
    next: Color,
    groups: Vec<ColorGroup>,
}

impl ColorStore {
    /// A fresh store for one workflow; color 0 is reserved for the root.
    pub fn new() -> Self {
        Self {
            next: 1,
            groups: Vec::new(),
        }
    }

    /// Allocates `size` fresh colors as a new group for `node_id` splitting
    /// at `parent_color`. Returns the existing group unchanged if one was
    /// already allocated for this (node, parent_color) pair — the
    /// "color-group-created" transition only fires once per split.
    pub fn allocate(&mut self, node_id: NodeId, parent_color: Color, size: i64) -> ColorGroup {
        if let Some(existing) = self.group_for(node_id, parent_color) {
            return existing;
        }
        let begin = self.next;
        let end = begin + size;
        self.next = end;
        let group = ColorGroup {
            node_id,
            parent_color,
            begin,
            end,
        };
        self.groups.push(group);
        group
    }

    pub fn group_for(&self, node_id: NodeId, parent_color: Color) -> Option<ColorGroup> {
        self.groups
            .iter()
            .copied()
            .find(|g| g.node_id == node_id && g.parent_color == parent_color)
    }

    /// The group enclosing `color` for the split introduced by `node_id`,
    /// if that node ever split at a color this color descends from.
    pub fn group_containing(&self, node_id: NodeId, color: Color) -> Option<ColorGroup> {
        self.groups
            .iter()
            .copied()
            .find(|g| g.node_id == node_id && g.contains(color))
    }

    /// All groups this store has allocated, for persistence round-tripping.
    pub fn groups(&self) -> &[ColorGroup] {
        &self.groups
    }

    /// Rehydrates a store from previously persisted groups (storage layer
    /// owns durability; this just restores the allocator's invariants).
    pub fn from_groups(groups: Vec<ColorGroup>) -> Self {
        let next = groups.iter().map(|g| g.end).max().unwrap_or(1).max(1);
        Self { next, groups }
    }

    pub fn require_group_containing(&self, node_id: NodeId, color: Color) -> Result<ColorGroup> {
        self.group_containing(node_id, color)
            .ok_or_else(|| Error::no_such("color_group", format!("{node_id}@{color}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn groups_are_disjoint_and_contiguous() {
        let mut store = ColorStore::new();
        let a = store.allocate(Uuid::new_v4(), 0, 3);
        let b = store.allocate(Uuid::new_v4(), 0, 4);
        assert_eq!(a.begin, 1);
        assert_eq!(a.end, 4);
        assert_eq!(b.begin, 4);
        assert_eq!(b.end, 8);
    }

    #[test]
    fn allocating_twice_for_same_split_is_idempotent() {
        let mut store = ColorStore::new();
        let node = Uuid::new_v4();
        let first = store.allocate(node, 0, 2);
        let second = store.allocate(node, 0, 2);
        assert_eq!(first, second);
        assert_eq!(store.groups().len(), 1);
    }

    #[test]
    fn offset_of_indexes_within_group() {
        let mut store = ColorStore::new();
        let node = Uuid::new_v4();
        let group = store.allocate(node, 0, 3);
        assert_eq!(group.offset_of(group.begin), Some(0));
        assert_eq!(group.offset_of(group.begin + 2), Some(2));
        assert_eq!(group.offset_of(group.end), None);
    }

    #[test]
    fn exactly_one_enclosing_group_per_color_per_node() {
        let mut store = ColorStore::new();
        let node = Uuid::new_v4();
        let g1 = store.allocate(node, 0, 2);
        let g2 = store.allocate(node, g1.begin, 2);
        assert_eq!(store.group_containing(node, g1.begin), Some(g1));
        assert_eq!(store.group_containing(node, g2.begin), Some(g2));
        assert_ne!(g1, g2);
    }
}
