//! Cache Engine
//!
//! This module implements the entry manager for EmberKV — the "brain" of
//! the cache. It owns the progressive map and the three auxiliary indices
//! and applies every command as a single multi-index transaction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheEngine                           │
//! │                                                             │
//! │  ┌────────────────┐  key → Entry {value, ttl, count,        │
//! │  │ ProgressiveMap │            recency ───┐  frequency ─┐}  │
//! │  └────────────────┘                       │             │   │
//! │  ┌────────────────┐                       │             │   │
//! │  │ RecencyIndex   │ ◄── O(1) touch ───────┘             │   │
//! │  └────────────────┘                                     │   │
//! │  ┌────────────────┐                                     │   │
//! │  │ FrequencyIndex │ ◄── O(1) promote ───────────────────┘   │
//! │  └────────────────┘                                         │
//! │  ┌────────────────┐                                         │
//! │  │ ExpiryIndex    │ ◄── (deadline, key), drained on sweep   │
//! │  └────────────────┘                                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Consistency
//!
//! After every completed command:
//! - every key in the map has exactly one node in the recency index and
//!   one in the frequency index, reachable through its handles;
//! - every entry with a deadline appears in the expiry index under that
//!   exact deadline, and nothing else does;
//! - map, recency and frequency sizes agree.
//!
//! The engine is single-threaded by design: the event loop owns it, each
//! command runs to completion, and index updates are plain allocations, so
//! a transaction can never observe a partially applied sibling.

use crate::storage::entry::Entry;
use crate::storage::expiry::ExpiryIndex;
use crate::storage::frequency::FrequencyIndex;
use crate::storage::map::ProgressiveMap;
use crate::storage::recency::RecencyIndex;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tracing::debug;

/// Result of a `ttl` lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlOutcome {
    /// Key is live and expires in this many whole seconds (floor).
    Remaining(u64),
    /// Key is live but was stored without a deadline.
    NoExpiry,
    /// Key is absent or already expired.
    Missing,
}

/// The multi-index entry manager.
///
/// # Example
///
/// ```
/// use emberkv::storage::CacheEngine;
/// use bytes::Bytes;
///
/// let mut engine = CacheEngine::new();
/// engine.set(Bytes::from("name"), Bytes::from("ember"));
/// assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("ember")));
/// ```
#[derive(Default)]
pub struct CacheEngine {
    map: ProgressiveMap<Bytes, Entry>,
    recency: RecencyIndex,
    frequency: FrequencyIndex,
    expiry: ExpiryIndex,
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("resizing", &self.is_resizing())
            .field("pending_deadlines", &self.expiry.len())
            .finish()
    }
}

impl CacheEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a key's value. Counts as an access: the key becomes the most
    /// recently used and its frequency rises by one.
    pub fn get(&mut self, key: &Bytes) -> Option<Bytes> {
        self.get_at(key, Instant::now())
    }

    /// Stores a value without a deadline. Overwriting an existing key
    /// keeps its access count and frequency-group membership; a prior
    /// deadline is dropped.
    pub fn set(&mut self, key: Bytes, value: Bytes) {
        self.set_at(key, value, Instant::now());
    }

    /// Stores a value that expires after `ttl_secs` seconds. An existing
    /// key is replaced outright: its access count restarts at zero and it
    /// becomes the most recently used.
    pub fn set_ex(&mut self, key: Bytes, value: Bytes, ttl_secs: u64) {
        self.set_ex_at(key, value, ttl_secs, Instant::now());
    }

    /// Deletes a key. Returns `true` if it was present.
    pub fn del(&mut self, key: &Bytes) -> bool {
        self.del_at(key, Instant::now())
    }

    /// Reports the remaining time-to-live for a key.
    pub fn ttl(&mut self, key: &Bytes) -> TtlOutcome {
        self.ttl_at(key, Instant::now())
    }

    /// Evicts the least recently used key, returning it.
    pub fn evict_lru(&mut self) -> Option<Bytes> {
        self.evict_lru_at(Instant::now())
    }

    /// Evicts the least frequently used key, returning it. Ties within the
    /// lowest frequency group fall on the key promoted into it earliest.
    pub fn evict_lfu(&mut self) -> Option<Bytes> {
        self.evict_lfu_at(Instant::now())
    }

    /// Removes every entry whose deadline has passed. Returns how many
    /// entries were reclaimed.
    pub fn sweep(&mut self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Bucket capacity of the authoritative hash table.
    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    /// Load of the authoritative hash table.
    pub fn load_factor(&self) -> f64 {
        self.map.load_factor()
    }

    /// Returns `true` while the hash table is mid-resize.
    pub fn is_resizing(&self) -> bool {
        self.map.is_resizing()
    }

    /// Earliest pending expiration deadline, used to bound the event
    /// loop's poll timeout.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.expiry.next_deadline()
    }

    /// Drops every entry and resets the hash table.
    pub fn clear(&mut self) {
        self.map.clear();
        self.recency = RecencyIndex::new();
        self.frequency = FrequencyIndex::new();
        self.expiry = ExpiryIndex::new();
    }

    pub(crate) fn get_at(&mut self, key: &Bytes, now: Instant) -> Option<Bytes> {
        self.sweep_at(now);

        let entry = self.map.lookup_mut(key)?;
        entry.access_count += 1;
        let value = entry.value.clone();
        let (recency, frequency) = (entry.recency, entry.frequency);

        self.recency.touch(recency);
        self.frequency.record_access(frequency);
        Some(value)
    }

    pub(crate) fn set_at(&mut self, key: Bytes, value: Bytes, now: Instant) {
        self.sweep_at(now);

        if let Some(entry) = self.map.lookup_mut(&key) {
            entry.value = value;
            let prior_deadline = entry.expires_at.take();
            let recency = entry.recency;

            if let Some(deadline) = prior_deadline {
                self.expiry.remove(deadline, &key);
            }
            self.recency.touch(recency);
            return;
        }

        let recency = self.recency.insert(key.clone());
        let frequency = self.frequency.insert(key.clone(), 0);
        self.map.set(key, Entry::new(value, now, recency, frequency));
    }

    pub(crate) fn set_ex_at(&mut self, key: Bytes, value: Bytes, ttl_secs: u64, now: Instant) {
        self.sweep_at(now);

        // Replace, not update: the old entry's count and recency die with it.
        self.remove_entry(&key);

        // TTLs are clamped to the wire format's u32 seconds range.
        let deadline = now + Duration::from_secs(ttl_secs.min(u64::from(u32::MAX)));
        let recency = self.recency.insert(key.clone());
        let frequency = self.frequency.insert(key.clone(), 0);
        self.expiry.insert(deadline, key.clone());
        self.map
            .set(key, Entry::with_deadline(value, now, deadline, recency, frequency));
    }

    pub(crate) fn del_at(&mut self, key: &Bytes, now: Instant) -> bool {
        self.sweep_at(now);
        self.remove_entry(key)
    }

    pub(crate) fn ttl_at(&mut self, key: &Bytes, now: Instant) -> TtlOutcome {
        self.sweep_at(now);

        match self.map.lookup(key) {
            Some(entry) => match entry.remaining_ttl(now) {
                Some(remaining) => TtlOutcome::Remaining(remaining.as_secs()),
                None => TtlOutcome::NoExpiry,
            },
            None => TtlOutcome::Missing,
        }
    }

    pub(crate) fn evict_lru_at(&mut self, now: Instant) -> Option<Bytes> {
        self.sweep_at(now);

        let victim = self.recency.tail_key()?.clone();
        self.remove_entry(&victim);
        debug!(key = ?victim, "evicted LRU victim");
        Some(victim)
    }

    pub(crate) fn evict_lfu_at(&mut self, now: Instant) -> Option<Bytes> {
        self.sweep_at(now);

        let victim = self.frequency.least_frequent_key()?.clone();
        self.remove_entry(&victim);
        debug!(key = ?victim, "evicted LFU victim");
        Some(victim)
    }

    pub(crate) fn sweep_at(&mut self, now: Instant) -> usize {
        let due = self.expiry.drain_due(now);
        let reclaimed = due.len();
        for key in due {
            if let Some(entry) = self.map.del(&key) {
                self.recency.remove(entry.recency);
                self.frequency.remove(entry.frequency);
            }
        }
        if reclaimed > 0 {
            debug!(reclaimed, remaining = self.map.len(), "expired entries swept");
        }
        reclaimed
    }

    /// Removes a key from the map and unlinks it from every index.
    /// The shared removal transaction behind `del`, eviction and `set ex`.
    fn remove_entry(&mut self, key: &Bytes) -> bool {
        match self.map.del(key) {
            Some(entry) => {
                self.recency.remove(entry.recency);
                self.frequency.remove(entry.frequency);
                if let Some(deadline) = entry.expires_at {
                    self.expiry.remove(deadline, key);
                }
                true
            }
            None => false,
        }
    }
}
