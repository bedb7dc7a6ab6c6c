//! Storage Layer
//!
//! The cache core: a progressive hash table plus the three auxiliary
//! indices, tied together by the [`CacheEngine`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheEngine                           │
//! │   ┌──────────────────┐   ┌──────────┐  ┌──────────────┐    │
//! │   │ ProgressiveMap   │   │ Recency  │  │  Frequency   │    │
//! │   │ (key → Entry)    │   │  (LRU)   │  │   (LFU)      │    │
//! │   └──────────────────┘   └──────────┘  └──────────────┘    │
//! │                          ┌──────────────────┐               │
//! │                          │   ExpiryIndex    │               │
//! │                          │ (deadline, key)  │               │
//! │                          └──────────────────┘               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every command is applied as one transaction across all four structures,
//! so a key visible in the map is always reachable by recency, by
//! frequency, and (when it has a deadline) by expiration time.

pub mod engine;
pub mod entry;
pub mod expiry;
pub mod frequency;
pub mod map;
pub mod recency;

// Re-export commonly used types
pub use engine::{CacheEngine, TtlOutcome};
pub use entry::Entry;
pub use expiry::ExpiryIndex;
pub use frequency::{FrequencyHandle, FrequencyIndex};
pub use map::ProgressiveMap;
pub use recency::{RecencyHandle, RecencyIndex};
