//! Cache entry and layer bookkeeping types.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::fingerprint::FingerprintPair;
use super::keys::ListKey;
use crate::domain::Record;

/// Which tier of the layered store produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheLayer {
    L1,
    L2,
    L3,
}

impl CacheLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheLayer::L1 => "l1",
            CacheLayer::L2 => "l2",
            CacheLayer::L3 => "l3",
        }
    }
}

impl fmt::Display for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a request was answered from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cached result set, stamped with the fingerprints that were current
/// when it was produced.
///
/// L1 holds live values; L2/L3 serialize entries to compressed JSON. An
/// entry is only served while both fingerprints still match the generator's
/// current values; a mismatch tombstones it regardless of TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: ListKey,
    pub records: Vec<Record>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub build_fingerprint: String,
    pub data_fingerprint: Option<String>,
    pub total_items: usize,
}

impl CacheEntry {
    pub fn new(key: ListKey, records: Vec<Record>, fingerprints: &FingerprintPair) -> Self {
        let total_items = records.len();
        Self {
            key,
            records,
            created_at: OffsetDateTime::now_utc(),
            build_fingerprint: fingerprints.build.clone(),
            data_fingerprint: fingerprints.data.clone(),
            total_items,
        }
    }

    /// Age of the entry; zero when the clock has gone backwards.
    pub fn age(&self) -> Duration {
        let elapsed = OffsetDateTime::now_utc() - self.created_at;
        elapsed.try_into().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// True when the entry may still be served against the current
    /// fingerprints. An entry whose data fingerprint was never computed is
    /// unverifiable and therefore stale.
    pub fn matches(&self, current: &FingerprintPair) -> bool {
        if self.build_fingerprint != current.build {
            return false;
        }
        match (&self.data_fingerprint, &current.data) {
            (Some(stored), Some(live)) => stored == live,
            _ => false,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResultSet;

    fn fingerprints(build: &str, data: Option<&str>) -> FingerprintPair {
        FingerprintPair {
            build: build.to_string(),
            data: data.map(str::to_string),
        }
    }

    fn entry(build: &str, data: Option<&str>) -> CacheEntry {
        CacheEntry::new(
            ListKey::whole(ResultSet::All, &[]),
            vec![Record::new("d-1", None)],
            &fingerprints(build, data),
        )
    }

    #[test]
    fn matching_fingerprints_keep_the_entry_valid() {
        let entry = entry("b1", Some("d1"));
        assert!(entry.matches(&fingerprints("b1", Some("d1"))));
    }

    #[test]
    fn build_fingerprint_change_invalidates() {
        let entry = entry("b1", Some("d1"));
        assert!(!entry.matches(&fingerprints("b2", Some("d1"))));
    }

    #[test]
    fn data_fingerprint_change_invalidates() {
        let entry = entry("b1", Some("d1"));
        assert!(!entry.matches(&fingerprints("b1", Some("d2"))));
    }

    #[test]
    fn unverifiable_data_fingerprint_is_stale() {
        let unverified = entry("b1", None);
        assert!(!unverified.matches(&fingerprints("b1", Some("d1"))));
        assert!(!unverified.matches(&fingerprints("b1", None)));

        let verified = entry("b1", Some("d1"));
        assert!(!verified.matches(&fingerprints("b1", None)));
    }

}
