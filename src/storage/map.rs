//! Progressive Hash Table
//!
//! This module implements the key→entry store for EmberKV: a chained hash
//! table that resizes *incrementally* instead of rehashing everything at
//! once. During a resize two tables coexist and every operation migrates a
//! small, bounded amount of data, so worst-case latency stays flat no matter
//! how large the table has grown.
//!
//! ## How a resize works
//!
//! ```text
//!            primary (old)                     secondary (new)
//!  ┌────┬────┬────┬────┬────┬────┐   ┌────┬────┬────┬────┬────┬────┬───
//!  │ .. │ .. │ a→b│ c  │ d  │ .. │   │    │ a  │    │ b→c│    │    │ ..
//!  └────┴────┴────┴────┴────┴────┘   └────┴────┴────┴────┴────┴────┴───
//!              ▲
//!        resize_cursor: buckets below the cursor are already drained
//! ```
//!
//! Each helping operation drains one bucket (every chained entry in it) from
//! `primary` into `secondary` and advances the cursor. When the cursor walks
//! off the end, `secondary` becomes the new `primary`.
//!
//! ## Routing rules during a resize
//!
//! - Lookups probe `secondary` first (migrated entries live there), then
//!   `primary`.
//! - A brand-new key hashes to its `primary` bucket index: if that bucket is
//!   already drained the key goes straight into `secondary`, otherwise into
//!   `primary` where it will be migrated with its bucket. This keeps every
//!   key in exactly one table without per-bucket markers.
//!
//! Reads also make migration progress: a read-heavy workload still finishes
//! an in-flight resize.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Initial number of buckets.
pub const INITIAL_CAPACITY: usize = 16;

/// The table never shrinks below this many buckets.
pub const MIN_CAPACITY: usize = 16;

/// Buckets drained per helping operation.
const REHASH_STEPS: usize = 1;

/// Load factor above which the table starts growing.
const LOAD_FACTOR_HIGH: f64 = 0.75;

/// Load factor below which the table starts shrinking.
const LOAD_FACTOR_LOW: f64 = 0.25;

type Link<K, V> = Option<Box<Node<K, V>>>;

struct Node<K, V> {
    key: K,
    value: V,
    next: Link<K, V>,
}

/// One chained hash table. Capacity is always a power of two so the bucket
/// index is `hash & mask`.
struct Table<K, V> {
    buckets: Vec<Link<K, V>>,
    mask: usize,
    len: usize,
}

impl<K: Hash + Eq, V> Table<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.next_power_of_two();
        let mut buckets = Vec::new();
        buckets.resize_with(capacity, || None);
        Self {
            buckets,
            mask: capacity - 1,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn get(&self, hash: u64, key: &K) -> Option<&V> {
        let mut cur = self.buckets[hash as usize & self.mask].as_ref();
        while let Some(node) = cur {
            if node.key == *key {
                return Some(&node.value);
            }
            cur = node.next.as_ref();
        }
        None
    }

    fn get_mut(&mut self, hash: u64, key: &K) -> Option<&mut V> {
        let mut cur = self.buckets[hash as usize & self.mask].as_mut();
        while let Some(node) = cur {
            if node.key == *key {
                return Some(&mut node.value);
            }
            cur = node.next.as_mut();
        }
        None
    }

    fn push(&mut self, hash: u64, key: K, value: V) {
        let idx = hash as usize & self.mask;
        let node = Box::new(Node {
            key,
            value,
            next: self.buckets[idx].take(),
        });
        self.buckets[idx] = Some(node);
        self.len += 1;
    }

    fn remove(&mut self, hash: u64, key: &K) -> Option<V> {
        fn remove_from<K: Eq, V>(link: &mut Link<K, V>, key: &K) -> Option<V> {
            match link {
                Some(node) if node.key != *key => remove_from(&mut node.next, key),
                Some(_) => {
                    let mut node = link.take().unwrap();
                    *link = node.next.take();
                    Some(node.value)
                }
                None => None,
            }
        }
        let result = remove_from(&mut self.buckets[hash as usize & self.mask], key);
        if result.is_some() {
            self.len -= 1;
        }
        result
    }
}

/// A hash map with incremental resizing.
///
/// The contract mirrors a plain hash map (`lookup`, `set`, `del`, `len`)
/// plus introspection used by the engine and tests (`capacity`,
/// `load_factor`, `is_resizing`). All operations are amortized O(1); the
/// migration quantum bounds the extra work any single operation performs.
///
/// # Example
///
/// ```
/// use emberkv::storage::ProgressiveMap;
///
/// let mut map = ProgressiveMap::new();
/// map.set("answer", 42);
/// assert_eq!(map.lookup(&"answer"), Some(&42));
/// assert_eq!(map.del(&"answer"), Some(42));
/// assert!(map.is_empty());
/// ```
pub struct ProgressiveMap<K, V> {
    primary: Table<K, V>,
    secondary: Option<Table<K, V>>,
    /// Next `primary` bucket to drain into `secondary`.
    resize_cursor: usize,
    /// Direction of the active resize.
    shrinking: bool,
}

impl<K: Hash + Eq, V> Default for ProgressiveMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V> ProgressiveMap<K, V> {
    /// Creates an empty map with the initial capacity.
    pub fn new() -> Self {
        Self {
            primary: Table::with_capacity(INITIAL_CAPACITY),
            secondary: None,
            resize_cursor: 0,
            shrinking: false,
        }
    }

    fn hash_key(key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Looks up a key, returning a reference to its value.
    ///
    /// Also drives migration: reads make resize progress too, so a
    /// read-only workload still completes an in-flight resize.
    pub fn lookup(&mut self, key: &K) -> Option<&V> {
        self.help_resizing();

        let hash = Self::hash_key(key);
        if let Some(secondary) = &self.secondary {
            if let Some(value) = secondary.get(hash, key) {
                return Some(value);
            }
        }
        self.primary.get(hash, key)
    }

    /// Looks up a key, returning a mutable reference to its value.
    pub fn lookup_mut(&mut self, key: &K) -> Option<&mut V> {
        self.help_resizing();

        let hash = Self::hash_key(key);
        if let Some(secondary) = &mut self.secondary {
            if let Some(value) = secondary.get_mut(hash, key) {
                return Some(value);
            }
        }
        self.primary.get_mut(hash, key)
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// was already present.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        self.help_resizing();

        let hash = Self::hash_key(&key);

        // Update in place wherever the key already lives.
        if let Some(secondary) = &mut self.secondary {
            if let Some(slot) = secondary.get_mut(hash, &key) {
                return Some(std::mem::replace(slot, value));
            }
        }
        if let Some(slot) = self.primary.get_mut(hash, &key) {
            return Some(std::mem::replace(slot, value));
        }

        // New key: route by whether its primary bucket was already drained.
        let primary_idx = hash as usize & self.primary.mask;
        match &mut self.secondary {
            Some(secondary) if primary_idx < self.resize_cursor => {
                secondary.push(hash, key, value);
            }
            _ => self.primary.push(hash, key, value),
        }

        self.check_load_factor();
        None
    }

    /// Removes a key, returning its value if it was present.
    pub fn del(&mut self, key: &K) -> Option<V> {
        self.help_resizing();

        let hash = Self::hash_key(key);
        let removed = match &mut self.secondary {
            Some(secondary) => secondary
                .remove(hash, key)
                .or_else(|| self.primary.remove(hash, key)),
            None => self.primary.remove(hash, key),
        };

        if removed.is_some() {
            self.check_load_factor();
        }
        removed
    }

    /// Returns `true` if the key is present.
    pub fn contains(&self, key: &K) -> bool {
        let hash = Self::hash_key(key);
        self.secondary
            .as_ref()
            .is_some_and(|secondary| secondary.get(hash, key).is_some())
            || self.primary.get(hash, key).is_some()
    }

    /// Number of live entries across both tables.
    pub fn len(&self) -> usize {
        self.primary.len + self.secondary.as_ref().map_or(0, |t| t.len)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket count of the authoritative (primary) table.
    pub fn capacity(&self) -> usize {
        self.primary.capacity()
    }

    /// Load of the authoritative table.
    pub fn load_factor(&self) -> f64 {
        self.primary.len as f64 / self.primary.capacity() as f64
    }

    /// Returns `true` while an incremental resize is in flight.
    pub fn is_resizing(&self) -> bool {
        self.secondary.is_some()
    }

    /// Direction of the active resize; meaningless when not resizing.
    pub fn is_shrinking(&self) -> bool {
        self.shrinking
    }

    /// Drops every entry and resets to the initial capacity.
    pub fn clear(&mut self) {
        self.primary = Table::with_capacity(INITIAL_CAPACITY);
        self.secondary = None;
        self.resize_cursor = 0;
        self.shrinking = false;
    }

    /// Visits every entry; during a resize the migrated (secondary) entries
    /// come first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let mut tables = Vec::with_capacity(2);
        if let Some(secondary) = &self.secondary {
            tables.push(secondary);
        }
        tables.push(&self.primary);
        Iter {
            tables,
            table_idx: 0,
            bucket_idx: 0,
            node: None,
        }
    }

    /// Drains up to [`REHASH_STEPS`] buckets of the primary table into the
    /// secondary. Empty buckets are skipped without counting; a drained
    /// bucket moves all of its chained entries at once.
    fn help_resizing(&mut self) {
        let Some(secondary) = &mut self.secondary else {
            return;
        };

        let mut moved = 0;
        while moved < REHASH_STEPS && self.resize_cursor < self.primary.buckets.len() {
            let mut chain = self.primary.buckets[self.resize_cursor].take();
            while let Some(mut node) = chain {
                chain = node.next.take();

                let hash = Self::hash_key(&node.key);
                let idx = hash as usize & secondary.mask;
                node.next = secondary.buckets[idx].take();
                secondary.buckets[idx] = Some(node);

                self.primary.len -= 1;
                secondary.len += 1;
                moved += 1;
            }
            self.resize_cursor += 1;
        }

        if self.resize_cursor >= self.primary.buckets.len() {
            // Migration complete: the secondary becomes authoritative.
            if let Some(next) = self.secondary.take() {
                self.primary = next;
            }
            self.resize_cursor = 0;
            self.shrinking = false;
        }
    }

    /// Starts a resize if the load crossed a threshold. Only consulted when
    /// no resize is active.
    fn check_load_factor(&mut self) {
        if self.secondary.is_some() {
            return;
        }

        let load = self.primary.len as f64 / self.primary.capacity() as f64;
        if load > LOAD_FACTOR_HIGH {
            self.start_resizing(false);
        } else if load < LOAD_FACTOR_LOW && self.primary.capacity() > MIN_CAPACITY {
            self.start_resizing(true);
        }
    }

    fn start_resizing(&mut self, shrink: bool) {
        debug_assert!(self.secondary.is_none());

        let new_capacity = if shrink {
            let halved = self.primary.capacity() / 2;
            if halved < MIN_CAPACITY {
                return;
            }
            halved
        } else {
            self.primary.capacity() * 2
        };

        self.secondary = Some(Table::with_capacity(new_capacity));
        self.resize_cursor = 0;
        self.shrinking = shrink;
    }

    #[cfg(test)]
    fn in_primary(&self, key: &K) -> bool {
        self.primary.get(Self::hash_key(key), key).is_some()
    }

    #[cfg(test)]
    fn in_secondary(&self, key: &K) -> bool {
        self.secondary
            .as_ref()
            .is_some_and(|secondary| secondary.get(Self::hash_key(key), key).is_some())
    }
}

/// Iterator over `(&K, &V)` pairs in both tables.
pub struct Iter<'a, K, V> {
    tables: Vec<&'a Table<K, V>>,
    table_idx: usize,
    bucket_idx: usize,
    node: Option<&'a Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(node) = self.node {
                self.node = node.next.as_deref();
                return Some((&node.key, &node.value));
            }

            let table = self.tables.get(self.table_idx)?;
            match table.buckets.get(self.bucket_idx) {
                Some(link) => {
                    self.node = link.as_deref();
                    self.bucket_idx += 1;
                }
                None => {
                    self.table_idx += 1;
                    self.bucket_idx = 0;
                }
            }
        }
    }
}
