//! Cache Entry
//!
//! A stored value together with its metadata: creation time, optional
//! expiration deadline, access count, and the handles that tie the entry to
//! its nodes in the recency and frequency indices.
//!
//! The handles are non-owning back-references. The indices own the nodes;
//! an entry's handles are valid exactly as long as the entry itself lives,
//! and every removal path unlinks them in the same transaction.

use crate::storage::frequency::FrequencyHandle;
use crate::storage::recency::RecencyHandle;
use bytes::Bytes;
use std::time::{Duration, Instant};

/// A stored value with expiry and eviction metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value.
    pub value: Bytes,
    /// When this entry was inserted.
    pub created_at: Instant,
    /// Expiration deadline; `None` means the entry never expires.
    pub expires_at: Option<Instant>,
    /// Number of successful reads of this entry.
    pub access_count: u64,
    /// This key's node in the recency index.
    pub recency: RecencyHandle,
    /// This key's node in the frequency index.
    pub frequency: FrequencyHandle,
}

impl Entry {
    /// Creates an entry without expiry.
    pub fn new(value: Bytes, now: Instant, recency: RecencyHandle, frequency: FrequencyHandle) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: None,
            access_count: 0,
            recency,
            frequency,
        }
    }

    /// Creates an entry that expires at `deadline`.
    pub fn with_deadline(
        value: Bytes,
        now: Instant,
        deadline: Instant,
        recency: RecencyHandle,
        frequency: FrequencyHandle,
    ) -> Self {
        Self {
            value,
            created_at: now,
            expires_at: Some(deadline),
            access_count: 0,
            recency,
            frequency,
        }
    }

    /// Returns `true` if the entry carries an expiration deadline.
    #[inline]
    pub fn has_ttl(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Returns `true` if the entry's deadline has passed at `now`.
    #[inline]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }

    /// Remaining time until expiry at `now`, or `None` for entries without
    /// a deadline. Already-due entries report a zero remainder.
    pub fn remaining_ttl(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::frequency::FrequencyIndex;
    use crate::storage::recency::RecencyIndex;

    fn handles() -> (RecencyHandle, FrequencyHandle) {
        let mut recency = RecencyIndex::new();
        let mut frequency = FrequencyIndex::new();
        (
            recency.insert(Bytes::from("k")),
            frequency.insert(Bytes::from("k"), 0),
        )
    }

    #[test]
    fn test_entry_without_ttl() {
        let now = Instant::now();
        let (r, f) = handles();
        let entry = Entry::new(Bytes::from("v"), now, r, f);
        assert!(!entry.has_ttl());
        assert!(!entry.is_expired_at(now + Duration::from_secs(3600)));
        assert_eq!(entry.remaining_ttl(now), None);
        assert_eq!(entry.access_count, 0);
    }

    #[test]
    fn test_entry_with_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(5);
        let (r, f) = handles();
        let entry = Entry::with_deadline(Bytes::from("v"), now, deadline, r, f);
        assert!(entry.has_ttl());
        assert!(!entry.is_expired_at(now));
        assert!(entry.is_expired_at(deadline));
        assert_eq!(entry.remaining_ttl(now), Some(Duration::from_secs(5)));
        assert_eq!(
            entry.remaining_ttl(now + Duration::from_secs(3)),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn test_remaining_ttl_saturates_past_deadline() {
        let now = Instant::now();
        let deadline = now + Duration::from_secs(1);
        let (r, f) = handles();
        let entry = Entry::with_deadline(Bytes::from("v"), now, deadline, r, f);
        assert_eq!(
            entry.remaining_ttl(now + Duration::from_secs(10)),
            Some(Duration::ZERO)
        );
    }
}
