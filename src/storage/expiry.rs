//! Expiration Index (TTL order)
//!
//! An ordered set of `(deadline, key)` pairs. Ordering by deadline first
//! and key second makes the sweep deterministic: two entries due at the
//! same instant are always drained in key order.
//!
//! The engine consults [`ExpiryIndex::next_deadline`] to size the event
//! loop's poll timeout, so expired keys are reclaimed even when no client
//! traffic arrives.

use bytes::Bytes;
use std::collections::BTreeSet;
use std::time::Instant;

/// Ordered set of expiration deadlines.
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    deadlines: BTreeSet<(Instant, Bytes)>,
}

impl ExpiryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending deadlines.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Returns `true` if no deadlines are pending.
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Registers a deadline for a key.
    pub fn insert(&mut self, deadline: Instant, key: Bytes) {
        self.deadlines.insert((deadline, key));
    }

    /// Unregisters a (deadline, key) pair. Returns `true` if it was present.
    pub fn remove(&mut self, deadline: Instant, key: &Bytes) -> bool {
        self.deadlines.remove(&(deadline, key.clone()))
    }

    /// Returns `true` if the exact (deadline, key) pair is registered.
    pub fn contains(&self, deadline: Instant, key: &Bytes) -> bool {
        self.deadlines.contains(&(deadline, key.clone()))
    }

    /// Removes and returns every key whose deadline is at or before `now`,
    /// in (deadline, key) order.
    pub fn drain_due(&mut self, now: Instant) -> Vec<Bytes> {
        let mut due = Vec::new();
        while let Some((deadline, _)) = self.deadlines.first() {
            if *deadline > now {
                break;
            }
            if let Some((_, key)) = self.deadlines.pop_first() {
                due.push(key);
            }
        }
        due
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.first().map(|(deadline, _)| *deadline)
    }
}
