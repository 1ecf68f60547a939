//! Version fingerprints used for lazy cache invalidation.
//!
//! Two independent signals decide whether a cached entry may be served:
//!
//! - the **build fingerprint**, a digest of the source of every code unit
//!   that participates in producing the dataset, fixed at compile time, so a
//!   deploy that changes producer logic busts the cache without any manual
//!   version bump;
//! - the **data fingerprint**, a digest of the most recent mutation
//!   timestamp observed across the upstream sources. Computing it exactly
//!   requires an upstream probe, so the value is cached here with a short
//!   TTL and refreshed by a detached task. A request always reads the last
//!   computed value and never blocks on a probe.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::fingerprint";

/// Truncated hex length of both fingerprints.
const FINGERPRINT_LEN: usize = 16;

/// Value hashed when no upstream source reports any mutation timestamp.
const EMPTY_UPSTREAM_MARKER: &str = "no-mutations";

/// Snapshot of both fingerprints at one point in time.
///
/// `data` is `None` until the first successful upstream probe; entries
/// compared against an absent data fingerprint are treated as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintPair {
    pub build: String,
    pub data: Option<String>,
}

#[derive(Debug, Clone)]
struct DataStamp {
    value: String,
    computed_at: OffsetDateTime,
}

/// Computes and caches the two fingerprints.
pub struct FingerprintGenerator {
    build: String,
    data: RwLock<Option<DataStamp>>,
    data_ttl: Duration,
    refreshing: AtomicBool,
}

impl FingerprintGenerator {
    /// Generator whose build fingerprint is derived from the embedded
    /// producer sources.
    pub fn new(data_ttl: Duration) -> Self {
        Self::with_build(build_fingerprint(), data_ttl)
    }

    /// Generator with an explicit build fingerprint. Used by tests to
    /// simulate a deploy that changes producer code.
    pub fn with_build(build: String, data_ttl: Duration) -> Self {
        Self {
            build,
            data: RwLock::new(None),
            data_ttl,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn build(&self) -> &str {
        &self.build
    }

    /// Last known fingerprints. Never probes upstream.
    pub fn current(&self) -> FingerprintPair {
        let stamp = rw_read(&self.data, SOURCE, "current");
        FingerprintPair {
            build: self.build.clone(),
            data: stamp.as_ref().map(|s| s.value.clone()),
        }
    }

    /// True when the cached data fingerprint is absent or older than its TTL
    /// and a background refresh should be scheduled.
    pub fn data_is_stale(&self) -> bool {
        let stamp = rw_read(&self.data, SOURCE, "data_is_stale");
        match stamp.as_ref() {
            None => true,
            Some(stamp) => {
                let age = OffsetDateTime::now_utc() - stamp.computed_at;
                age >= self.data_ttl
            }
        }
    }

    /// Record the outcome of an upstream mutation probe. Concurrent
    /// refreshers race benignly; last writer wins on an advisory value.
    pub fn record_latest_mutation(&self, latest: Option<OffsetDateTime>) {
        let value = data_fingerprint(latest);
        debug!(
            target = "hemolist::cache::fingerprint",
            fingerprint = %value,
            "data fingerprint refreshed"
        );
        *rw_write(&self.data, SOURCE, "record_latest_mutation") = Some(DataStamp {
            value,
            computed_at: OffsetDateTime::now_utc(),
        });
    }

    /// Claim the single refresh slot. Returns false when a refresh is
    /// already in flight, making concurrent triggers idempotent.
    pub fn try_begin_refresh(&self) -> bool {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_refresh(&self) {
        self.refreshing.store(false, Ordering::Release);
    }
}

fn short_digest(hasher: Sha256) -> String {
    let digest = hasher.finalize();
    hex::encode(&digest[..FINGERPRINT_LEN / 2])
}

/// Digest of the code units that produce the dataset. The sources are
/// embedded at compile time, so the value changes exactly when the producer
/// logic does.
fn build_fingerprint() -> String {
    static PRODUCER_SOURCES: &[&str] = &[
        include_str!("../domain/mod.rs"),
        include_str!("../application/producers.rs"),
        include_str!("../application/fetch.rs"),
        include_str!("../infra/upstream.rs"),
    ];

    let mut hasher = Sha256::new();
    for source in PRODUCER_SOURCES {
        hasher.update(source.as_bytes());
        hasher.update([0x1e]);
    }
    short_digest(hasher)
}

fn data_fingerprint(latest: Option<OffsetDateTime>) -> String {
    let stamp = latest
        .and_then(|ts| ts.format(&Rfc3339).ok())
        .unwrap_or_else(|| EMPTY_UPSTREAM_MARKER.to_string());

    let mut hasher = Sha256::new();
    hasher.update(stamp.as_bytes());
    short_digest(hasher)
}
