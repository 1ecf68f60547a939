//! L1: in-process cache layer.
//!
//! Fastest and smallest tier. Holds live `CacheEntry` values in an LRU map;
//! no serialization, no I/O, so a read is a lock plus a clone.

use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::Duration;

use globset::GlobMatcher;
use lru::LruCache;

use super::entry::CacheEntry;
use super::keys::ListKey;
#[cfg(test)]
use super::lock::rw_read;
use super::lock::rw_write;

const SOURCE: &str = "cache::memory";

pub struct MemoryLayer {
    entries: RwLock<LruCache<ListKey, CacheEntry>>,
    ttl: Duration,
}

impl MemoryLayer {
    pub fn new(limit: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(limit)),
            ttl,
        }
    }

    /// Fetch a live entry. Expired entries are dropped on sight.
    pub fn get(&self, key: &ListKey) -> Option<CacheEntry> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_expired(self.ttl) => {
                entries.pop(key);
                None
            }
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    pub fn put(&self, entry: CacheEntry) {
        rw_write(&self.entries, SOURCE, "put").put(entry.key.clone(), entry);
    }

    pub fn remove(&self, key: &ListKey) {
        rw_write(&self.entries, SOURCE, "remove").pop(key);
    }

    /// Drop every entry whose stem matches the pattern. Returns the number
    /// of entries removed; removing nothing is not an error.
    pub fn purge_matching(&self, matcher: &GlobMatcher) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "purge_matching");
        let doomed: Vec<ListKey> = entries
            .iter()
            .filter(|(key, _)| matcher.is_match(key.stem()))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
