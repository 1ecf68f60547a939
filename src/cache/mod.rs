//! Hemolist layered cache.
//!
//! Three ordered lookup tiers over one keyed entry model:
//!
//! - **L1**: in-process LRU of live entries, fastest, smallest
//! - **L2**: durable gzip-compressed blobs on local disk
//! - **L3**: optional shared blob directory, advisory, async-populated
//!
//! Entries carry a build fingerprint (producer source digest) and a data
//! fingerprint (upstream mutation digest); either changing tombstones the
//! entry at read time. Invalidation is lazy plus explicit glob purges;
//! there is no background sweeper.
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `hemolist.toml`:
//!
//! ```toml
//! [cache]
//! page_size = 25
//! l1_limit = 128
//! l2_dir = "cache"
//! # ... see config.rs for all options
//! ```

mod config;
mod disk;
mod entry;
pub mod etag;
mod fingerprint;
mod invalidate;
mod keys;
mod lock;
mod memory;
mod shared;
mod store;

pub use config::CacheConfig;
pub use entry::{CacheEntry, CacheLayer, CacheStatus};
pub use fingerprint::{FingerprintGenerator, FingerprintPair};
pub use invalidate::Invalidator;
pub use keys::ListKey;
pub use store::{LayeredStore, StoreHit};
