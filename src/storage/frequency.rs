//! Frequency Index (LFU order)
//!
//! Groups live keys by their exact access count. Each group is a doubly
//! linked list of keys (newest promotion at the head), and the groups
//! themselves sit in a `BTreeMap` keyed by count, so the lowest-frequency
//! group is always the first one. Nodes live in a [`slab::Slab`] and a
//! [`FrequencyHandle`] is the node's stable slab key.
//!
//! ```text
//!   count=1: head ─► k9 ◄──► k3 ◄── tail   (tail = oldest in group)
//!   count=2: head ─► k7 ◄── tail
//!   count=5: head ─► k1 ◄── tail
//! ```
//!
//! The eviction candidate is the *tail of the lowest group*: among equally
//! frequent keys, the one least recently promoted into the group goes
//! first. A group is removed the instant its last key leaves, so no empty
//! group ever exists.

use bytes::Bytes;
use slab::Slab;
use std::collections::btree_map::Entry as BTreeEntry;
use std::collections::BTreeMap;

/// Stable reference to a key's node in the frequency index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyHandle(usize);

#[derive(Debug)]
struct Node {
    key: Bytes,
    count: u64,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct Group {
    head: usize,
    tail: usize,
}

/// Keys grouped by exact access count, groups ordered ascending.
#[derive(Debug, Default)]
pub struct FrequencyIndex {
    nodes: Slab<Node>,
    groups: BTreeMap<u64, Group>,
}

impl FrequencyIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys across all groups.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a key to the group for `count`, creating the group if absent.
    pub fn insert(&mut self, key: Bytes, count: u64) -> FrequencyHandle {
        let idx = self.nodes.insert(Node {
            key,
            count,
            prev: None,
            next: None,
        });
        self.push_into_group(idx, count);
        FrequencyHandle(idx)
    }

    /// Moves a key from its current group to the next-higher one and
    /// returns the new count. The handle stays valid.
    pub fn record_access(&mut self, handle: FrequencyHandle) -> u64 {
        let old_count = self.nodes[handle.0].count;
        self.unlink_from_group(handle.0, old_count);

        let new_count = old_count + 1;
        self.nodes[handle.0].count = new_count;
        self.push_into_group(handle.0, new_count);
        new_count
    }

    /// Unlinks a key and returns it. Drops its group if now empty.
    pub fn remove(&mut self, handle: FrequencyHandle) -> Bytes {
        let count = self.nodes[handle.0].count;
        self.unlink_from_group(handle.0, count);
        self.nodes.remove(handle.0).key
    }

    /// The eviction candidate: tail of the lowest-frequency group.
    pub fn least_frequent_key(&self) -> Option<&Bytes> {
        let (_, group) = self.groups.first_key_value()?;
        Some(&self.nodes[group.tail].key)
    }

    /// Current access count recorded for a handle.
    pub fn count_of(&self, handle: FrequencyHandle) -> u64 {
        self.nodes[handle.0].count
    }

    /// Lowest access count present, if any key is tracked.
    pub fn min_count(&self) -> Option<u64> {
        self.groups.first_key_value().map(|(count, _)| *count)
    }

    /// Number of distinct frequency groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Keys in one group from newest to oldest promotion. Test aid.
    pub fn group_keys(&self, count: u64) -> Vec<Bytes> {
        let mut keys = Vec::new();
        let Some(group) = self.groups.get(&count) else {
            return keys;
        };
        let mut cursor = Some(group.head);
        while let Some(idx) = cursor {
            keys.push(self.nodes[idx].key.clone());
            cursor = self.nodes[idx].next;
        }
        keys
    }

    fn push_into_group(&mut self, idx: usize, count: u64) {
        match self.groups.entry(count) {
            BTreeEntry::Occupied(mut occupied) => {
                let old_head = occupied.get().head;
                occupied.get_mut().head = idx;
                self.nodes[idx].prev = None;
                self.nodes[idx].next = Some(old_head);
                self.nodes[old_head].prev = Some(idx);
            }
            BTreeEntry::Vacant(vacant) => {
                vacant.insert(Group { head: idx, tail: idx });
                self.nodes[idx].prev = None;
                self.nodes[idx].next = None;
            }
        }
    }

    fn unlink_from_group(&mut self, idx: usize, count: u64) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);

        if prev.is_none() && next.is_none() {
            // Last key in its group: the group goes with it.
            self.groups.remove(&count);
        } else if let Some(group) = self.groups.get_mut(&count) {
            match prev {
                Some(p) => self.nodes[p].next = next,
                None => {
                    if let Some(n) = next {
                        group.head = n;
                    }
                }
            }
            match next {
                Some(n) => self.nodes[n].prev = prev,
                None => {
                    if let Some(p) = prev {
                        group.tail = p;
                    }
                }
            }
        }

        self.nodes[idx].prev = None;
        self.nodes[idx].next = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_creates_group() {
        let mut index = FrequencyIndex::new();
        index.insert(Bytes::from("a"), 0);
        assert_eq!(index.len(), 1);
        assert_eq!(index.group_count(), 1);
        assert_eq!(index.min_count(), Some(0));
        assert_eq!(index.least_frequent_key(), Some(&Bytes::from("a")));
    }

    #[test]
    fn test_record_access_promotes() {
        let mut index = FrequencyIndex::new();
        let a = index.insert(Bytes::from("a"), 0);
        assert_eq!(index.record_access(a), 1);
        assert_eq!(index.count_of(a), 1);
        assert_eq!(index.min_count(), Some(1));
        // Old group must be gone.
        assert_eq!(index.group_count(), 1);
    }

    #[test]
    fn test_no_empty_groups_survive() {
        let mut index = FrequencyIndex::new();
        let a = index.insert(Bytes::from("a"), 0);
        let b = index.insert(Bytes::from("b"), 0);
        index.record_access(a);
        index.record_access(a);
        index.record_access(b);
        // Counts: a=2, b=1; groups 1 and 2 only.
        assert_eq!(index.group_count(), 2);
        assert_eq!(index.min_count(), Some(1));
        assert!(index.group_keys(0).is_empty());
    }

    #[test]
    fn test_tie_break_prefers_oldest_in_group() {
        let mut index = FrequencyIndex::new();
        index.insert(Bytes::from("first"), 0);
        index.insert(Bytes::from("second"), 0);
        index.insert(Bytes::from("third"), 0);
        // All at count 0; "first" has sat in the group longest.
        assert_eq!(index.least_frequent_key(), Some(&Bytes::from("first")));
    }

    #[test]
    fn test_promotion_resets_group_age() {
        let mut index = FrequencyIndex::new();
        let a = index.insert(Bytes::from("a"), 0);
        let b = index.insert(Bytes::from("b"), 0);
        index.record_access(a);
        index.record_access(b);
        // Both at count 1 now, but a was promoted before b, so a is older.
        assert_eq!(index.least_frequent_key(), Some(&Bytes::from("a")));
    }

    #[test]
    fn test_least_frequent_across_groups() {
        let mut index = FrequencyIndex::new();
        let hot = index.insert(Bytes::from("hot"), 0);
        index.insert(Bytes::from("cold"), 0);
        for _ in 0..3 {
            index.record_access(hot);
        }
        assert_eq!(index.least_frequent_key(), Some(&Bytes::from("cold")));
    }

    #[test]
    fn test_remove_middle_of_group() {
        let mut index = FrequencyIndex::new();
        index.insert(Bytes::from("a"), 0);
        let b = index.insert(Bytes::from("b"), 0);
        index.insert(Bytes::from("c"), 0);
        assert_eq!(index.remove(b), Bytes::from("b"));
        assert_eq!(index.group_keys(0), vec![Bytes::from("c"), Bytes::from("a")]);
    }

    #[test]
    fn test_remove_last_key_drops_group() {
        let mut index = FrequencyIndex::new();
        let a = index.insert(Bytes::from("a"), 0);
        index.remove(a);
        assert!(index.is_empty());
        assert_eq!(index.group_count(), 0);
        assert_eq!(index.least_frequent_key(), None);
    }

    #[test]
    fn test_insert_with_preserved_count() {
        // Re-inserting at a non-zero count joins the matching group.
        let mut index = FrequencyIndex::new();
        index.insert(Bytes::from("a"), 3);
        index.insert(Bytes::from("b"), 1);
        assert_eq!(index.min_count(), Some(1));
        assert_eq!(index.least_frequent_key(), Some(&Bytes::from("b")));
    }
}
