//! Layered store facade.
//!
//! Lookup order is L1 → L2 → L3. A hit from a lower layer is promoted into
//! L1 so repeat reads stay in-process. Every hit is validated against the
//! current fingerprints before it is returned; a mismatch purges the stale
//! entry from the layer that held it and the lookup continues downward.
//! This inline check is the only eviction sweep the store has.

use std::sync::Arc;

use globset::GlobMatcher;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::disk::DiskLayer;
use super::entry::{CacheEntry, CacheLayer};
use super::fingerprint::{FingerprintGenerator, FingerprintPair};
use super::keys::ListKey;
use super::memory::MemoryLayer;
use super::shared::SharedLayer;

/// A validated cache hit and the layer that produced it.
#[derive(Debug, Clone)]
pub struct StoreHit {
    pub entry: CacheEntry,
    pub source: CacheLayer,
}

pub struct LayeredStore {
    l1: MemoryLayer,
    l2: DiskLayer,
    l3: Arc<SharedLayer>,
    fingerprints: Arc<FingerprintGenerator>,
    config: CacheConfig,
}

impl LayeredStore {
    pub fn new(config: CacheConfig, fingerprints: Arc<FingerprintGenerator>) -> Self {
        let l1 = MemoryLayer::new(config.l1_limit_non_zero(), config.l1_ttl());
        let l2 = DiskLayer::new(config.l2_dir.clone(), config.l2_ttl());
        let l3 = Arc::new(SharedLayer::new(config.l3_dir.clone(), config.l3_ttl()));
        Self {
            l1,
            l2,
            l3,
            fingerprints,
            config,
        }
    }

    pub fn fingerprints(&self) -> &Arc<FingerprintGenerator> {
        &self.fingerprints
    }

    /// Look a key up across the layers.
    ///
    /// High-churn result sets never read from cache. A missing data
    /// fingerprint makes every entry unverifiable, which counts as a miss.
    pub fn get(&self, key: &ListKey) -> Option<StoreHit> {
        if self.config.is_high_churn(key.result_set()) {
            debug!(
                target = "hemolist::cache::store",
                key = %key,
                "high-churn result set bypasses cache"
            );
            counter!("hemolist_cache_bypass_total").increment(1);
            return None;
        }

        let current = self.fingerprints.current();
        if current.data.is_none() {
            debug!(
                target = "hemolist::cache::store",
                key = %key,
                "data fingerprint unavailable; assuming stale"
            );
            counter!("hemolist_cache_fingerprint_unavailable_total").increment(1);
            return None;
        }

        if let Some(entry) = self.l1.get(key) {
            if entry.matches(&current) {
                counter!("hemolist_cache_l1_hit_total").increment(1);
                return Some(StoreHit {
                    entry,
                    source: CacheLayer::L1,
                });
            }
            self.purge_stale(key, CacheLayer::L1, &entry, &current);
        }

        if let Some(entry) = self.l2.get(key) {
            if entry.matches(&current) {
                counter!("hemolist_cache_l2_hit_total").increment(1);
                self.l1.put(entry.clone());
                return Some(StoreHit {
                    entry,
                    source: CacheLayer::L2,
                });
            }
            self.purge_stale(key, CacheLayer::L2, &entry, &current);
        }

        if let Some(entry) = self.l3.get(key) {
            if entry.matches(&current) {
                counter!("hemolist_cache_l3_hit_total").increment(1);
                self.l1.put(entry.clone());
                return Some(StoreHit {
                    entry,
                    source: CacheLayer::L3,
                });
            }
            self.purge_stale(key, CacheLayer::L3, &entry, &current);
        }

        counter!("hemolist_cache_miss_total").increment(1);
        None
    }

    /// Populate the layers: L1 and L2 synchronously, L3 in a detached task.
    pub fn put(&self, entry: CacheEntry) {
        if self.config.is_high_churn(entry.key.result_set()) {
            return;
        }

        self.l2.put(&entry);
        if self.l3.is_enabled() {
            let l3 = Arc::clone(&self.l3);
            let detached = entry.clone();
            tokio::spawn(async move {
                l3.put(&detached);
            });
        }
        self.l1.put(entry);
    }

    /// Delete every entry matching the pattern across all layers. Returns
    /// the number of entries removed; purging an absent pattern is a no-op.
    pub fn purge_matching(&self, matcher: &GlobMatcher) -> usize {
        self.l1.purge_matching(matcher)
            + self.l2.purge_matching(matcher)
            + self.l3.purge_matching(matcher)
    }

    fn purge_stale(
        &self,
        key: &ListKey,
        layer: CacheLayer,
        entry: &CacheEntry,
        current: &FingerprintPair,
    ) {
        // Build-driven and data-driven invalidation are distinguished here
        // so deploy busts and data busts can be told apart in logs.
        let reason = if entry.build_fingerprint != current.build {
            "build"
        } else {
            "data"
        };
        debug!(
            target = "hemolist::cache::store",
            key = %key,
            layer = %layer,
            reason = reason,
            "purging fingerprint-stale entry"
        );
        counter!("hemolist_cache_stale_purged_total").increment(1);
        match layer {
            CacheLayer::L1 => self.l1.remove(key),
            CacheLayer::L2 => self.l2.remove(key),
            CacheLayer::L3 => self.l3.remove(key),
        }
    }

    #[cfg(test)]
    pub(crate) fn l1_len(&self) -> usize {
        self.l1.len()
    }
}
