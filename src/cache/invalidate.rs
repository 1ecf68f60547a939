//! Explicit pattern-based invalidation.
//!
//! The implicit path (fingerprint mismatch purged lazily during
//! `LayeredStore::get`) needs no machinery here. This module covers the
//! explicit path: operator- or refresh-triggered purges of everything
//! matching a glob over key stems.

use std::sync::Arc;

use globset::Glob;
use tracing::{info, warn};

use super::store::LayeredStore;
use crate::domain::ResultSet;

pub struct Invalidator {
    store: Arc<LayeredStore>,
}

impl Invalidator {
    pub fn new(store: Arc<LayeredStore>) -> Self {
        Self { store }
    }

    /// Purge every entry matching a glob pattern such as
    /// `donors:pending:*`. Idempotent: purging an absent pattern removes
    /// nothing and is not an error. An unparsable pattern is logged and
    /// removes nothing.
    pub fn purge(&self, pattern: &str) -> usize {
        let matcher = match Glob::new(pattern) {
            Ok(glob) => glob.compile_matcher(),
            Err(error) => {
                warn!(
                    target = "hemolist::cache::invalidate",
                    pattern = pattern,
                    error = %error,
                    "invalid purge pattern ignored"
                );
                return 0;
            }
        };

        let removed = self.store.purge_matching(&matcher);
        if removed > 0 {
            info!(
                target = "hemolist::cache::invalidate",
                pattern = pattern,
                removed = removed,
                "cache entries purged"
            );
        }
        removed
    }

    /// Purge every cached view of one result set, all pages and parameter
    /// variants included.
    pub fn purge_result_set(&self, set: ResultSet) -> usize {
        self.purge(&format!("donors:{set}:*"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::config::CacheConfig;
    use crate::cache::entry::CacheEntry;
    use crate::cache::fingerprint::FingerprintGenerator;
    use crate::cache::keys::ListKey;
    use crate::domain::Record;
    use std::time::Duration;

    fn store_in(dir: &std::path::Path) -> Arc<LayeredStore> {
        let generator = Arc::new(FingerprintGenerator::with_build(
            "b1".to_string(),
            Duration::from_secs(60),
        ));
        generator.record_latest_mutation(None);
        let config = CacheConfig {
            l2_dir: dir.to_path_buf(),
            high_churn_sets: vec![],
            ..Default::default()
        };
        Arc::new(LayeredStore::new(config, generator))
    }

    fn seed(store: &LayeredStore, set: ResultSet) -> ListKey {
        let entry = CacheEntry::new(
            ListKey::whole(set, &[]),
            vec![Record::new("d-1", None)],
            &store.fingerprints().current(),
        );
        let key = entry.key.clone();
        store.put(entry);
        key
    }

    #[tokio::test]
    async fn purge_result_set_removes_only_that_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let pending = seed(&store, ResultSet::Pending);
        let approved = seed(&store, ResultSet::Approved);

        let invalidator = Invalidator::new(Arc::clone(&store));
        assert!(invalidator.purge_result_set(ResultSet::Pending) > 0);

        assert!(store.get(&pending).is_none());
        assert!(store.get(&approved).is_some());
    }

    #[tokio::test]
    async fn purging_an_absent_pattern_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let invalidator = Invalidator::new(store_in(dir.path()));
        assert_eq!(invalidator.purge("donors:deferred:*"), 0);
        assert_eq!(invalidator.purge("donors:deferred:*"), 0);
    }

    #[tokio::test]
    async fn invalid_pattern_removes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let key = seed(&store, ResultSet::All);

        let invalidator = Invalidator::new(Arc::clone(&store));
        assert_eq!(invalidator.purge("donors:[unclosed"), 0);
        assert!(store.get(&key).is_some());
    }
}
