//! L3: optional shared cache layer.
//!
//! A second blob directory, typically a mounted volume shared between
//! instances. Long-lived but advisory: its absence is not an error, it is
//! populated asynchronously, and every fault degrades to a miss exactly
//! like L2.

use std::path::PathBuf;
use std::time::Duration;

use globset::GlobMatcher;
use tracing::debug;

use super::disk::DiskLayer;
use super::entry::CacheEntry;
use super::keys::ListKey;

pub struct SharedLayer {
    inner: Option<DiskLayer>,
}

impl SharedLayer {
    pub fn new(root: Option<PathBuf>, ttl: Duration) -> Self {
        match root {
            Some(root) => {
                debug!(
                    target = "hemolist::cache::shared",
                    root = %root.display(),
                    "shared cache layer enabled"
                );
                Self {
                    inner: Some(DiskLayer::new(root, ttl)),
                }
            }
            None => Self { inner: None },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn get(&self, key: &ListKey) -> Option<CacheEntry> {
        self.inner.as_ref()?.get(key)
    }

    pub fn put(&self, entry: &CacheEntry) {
        if let Some(inner) = self.inner.as_ref() {
            inner.put(entry);
        }
    }

    pub fn remove(&self, key: &ListKey) {
        if let Some(inner) = self.inner.as_ref() {
            inner.remove(key);
        }
    }

    pub fn purge_matching(&self, matcher: &GlobMatcher) -> usize {
        self.inner
            .as_ref()
            .map(|inner| inner.purge_matching(matcher))
            .unwrap_or(0)
    }
}
