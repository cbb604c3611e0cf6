//! Time-to-live caption cache
//!
//! An in-memory map from identity key to a timestamped caption set. Entries are
//! never evicted; a stale entry is simply reported as a miss on the next read
//! and replaced by the next write.
//!
//! # Concurrency
//!
//! The map sits behind a `parking_lot::RwLock` and is safe to share across
//! request tasks. There is no per-key exclusion: two concurrent misses for the
//! same key may both fetch, and the last [`TtlCache::insert`] wins.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::caption::CaptionItem;
use crate::clock::SharedClock;

/// Default time-to-live for cached caption sets (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// A timestamped caption set
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    /// When the entry was written (wall-clock ms)
    pub timestamp_ms: u64,
    /// Cached captions (banned text already removed, no range/limit applied)
    pub items: Vec<CaptionItem>,
}

impl CacheEntry {
    /// Whether the entry is still fresh at `now_ms`
    #[must_use]
    pub fn is_fresh(&self, now_ms: u64, ttl: Duration) -> bool {
        let age = now_ms.saturating_sub(self.timestamp_ms);
        u128::from(age) < ttl.as_millis()
    }
}

/// Identity key for a caption set: `provider|source|id|title`
#[must_use]
pub fn identity_key(provider: &str, source: &str, id: &str, title: &str) -> String {
    format!("{provider}|{source}|{id}|{title}")
}

/// TTL cache of caption sets keyed by identity
pub struct TtlCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: SharedClock,
}

impl TtlCache {
    /// Create an empty cache
    #[must_use]
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    /// Configured time-to-live
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh captions for `key`, or `None` on a miss or a stale entry
    #[must_use]
    pub fn get_fresh(&self, key: &str) -> Option<Vec<CaptionItem>> {
        let now = self.clock.now_ms();
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.items.clone())
    }

    /// Store captions under `key` with a fresh timestamp
    pub fn insert(&self, key: impl Into<String>, items: Vec<CaptionItem>) {
        let entry = CacheEntry {
            timestamp_ms: self.clock.now_ms(),
            items,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Raw entry, fresh or not
    #[must_use]
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Number of stored entries, including stale ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no entries are stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl std::fmt::Debug for TtlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
