//! Cache configuration.
//!
//! Controls the three store layers, the fingerprint staleness bound, and
//! warming via `hemolist.toml`.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::ResultSet;

// Default values for cache configuration
const DEFAULT_PAGE_SIZE: usize = 25;
const DEFAULT_L1_LIMIT: usize = 128;
const DEFAULT_L1_TTL_SECONDS: u64 = 900;
const DEFAULT_L2_DIR: &str = "cache";
const DEFAULT_L2_TTL_SECONDS: u64 = 300;
const DEFAULT_L3_TTL_SECONDS: u64 = 1800;
const DEFAULT_DATA_FINGERPRINT_TTL_SECONDS: u64 = 60;
const DEFAULT_WARM_TIMEOUT_MS: u64 = 2000;

/// Cache configuration from `hemolist.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Records per page of the list endpoint.
    pub page_size: usize,
    /// Maximum entries held in the L1 in-process layer.
    pub l1_limit: usize,
    /// L1 TTL. Longest of the hot layers; holding an L1 entry costs nothing.
    pub l1_ttl_seconds: u64,
    /// Directory for L2 compressed blobs.
    pub l2_dir: PathBuf,
    /// L2 TTL.
    pub l2_ttl_seconds: u64,
    /// Optional directory for the shared L3 layer; absent disables L3.
    pub l3_dir: Option<PathBuf>,
    /// L3 TTL. Longest-lived, advisory only.
    pub l3_ttl_seconds: u64,
    /// Staleness bound of the cached data fingerprint.
    pub data_fingerprint_ttl_seconds: u64,
    /// Result sets that churn too fast for reuse. These never read from
    /// L1/L2 and every request fetches fresh.
    pub high_churn_sets: Vec<ResultSet>,
    /// Warm the other result sets after a response has been sent.
    pub warm_enabled: bool,
    /// Upper bound on each individual warm call.
    pub warm_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            l1_limit: DEFAULT_L1_LIMIT,
            l1_ttl_seconds: DEFAULT_L1_TTL_SECONDS,
            l2_dir: PathBuf::from(DEFAULT_L2_DIR),
            l2_ttl_seconds: DEFAULT_L2_TTL_SECONDS,
            l3_dir: None,
            l3_ttl_seconds: DEFAULT_L3_TTL_SECONDS,
            data_fingerprint_ttl_seconds: DEFAULT_DATA_FINGERPRINT_TTL_SECONDS,
            high_churn_sets: vec![ResultSet::Pending],
            warm_enabled: true,
            warm_timeout_ms: DEFAULT_WARM_TIMEOUT_MS,
        }
    }
}

impl CacheConfig {
    /// Returns the L1 limit as NonZeroUsize, clamping to 1 if zero.
    pub fn l1_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.l1_limit).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the page size, clamping to 1 if zero.
    pub fn page_size_non_zero(&self) -> usize {
        self.page_size.max(1)
    }

    pub fn l1_ttl(&self) -> Duration {
        Duration::from_secs(self.l1_ttl_seconds)
    }

    pub fn l2_ttl(&self) -> Duration {
        Duration::from_secs(self.l2_ttl_seconds)
    }

    pub fn l3_ttl(&self) -> Duration {
        Duration::from_secs(self.l3_ttl_seconds)
    }

    pub fn data_fingerprint_ttl(&self) -> Duration {
        Duration::from_secs(self.data_fingerprint_ttl_seconds)
    }

    pub fn warm_timeout(&self) -> Duration {
        Duration::from_millis(self.warm_timeout_ms)
    }

    /// True for result sets excluded from L1/L2 reuse.
    pub fn is_high_churn(&self, set: ResultSet) -> bool {
        self.high_churn_sets.contains(&set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.l1_limit, 128);
        assert_eq!(config.l1_ttl_seconds, 900);
        assert_eq!(config.l2_ttl_seconds, 300);
        assert!(config.l3_dir.is_none());
        assert_eq!(config.data_fingerprint_ttl_seconds, 60);
        assert!(config.warm_enabled);
        assert!(config.is_high_churn(ResultSet::Pending));
        assert!(!config.is_high_churn(ResultSet::Approved));
    }

    #[test]
    fn limits_clamp_to_minimums() {
        let config = CacheConfig {
            l1_limit: 0,
            page_size: 0,
            ..Default::default()
        };
        assert_eq!(config.l1_limit_non_zero().get(), 1);
        assert_eq!(config.page_size_non_zero(), 1);
    }
}
