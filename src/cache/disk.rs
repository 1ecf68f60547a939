//! L2: durable on-disk cache layer.
//!
//! Entries are gzip-compressed JSON blobs named after the key stem. Writes
//! go to a temp file in the same directory and are renamed into place, so a
//! concurrent reader never observes a partially written entry. Every I/O
//! fault degrades silently: the store falls through to the next layer or a
//! fresh fetch, and the fault is only logged.

use std::fs;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use globset::GlobMatcher;
use tracing::{debug, warn};

use super::entry::CacheEntry;
use super::keys::ListKey;

const BLOB_SUFFIX: &str = ".json.gz";

pub struct DiskLayer {
    root: PathBuf,
    ttl: Duration,
}

impl DiskLayer {
    /// Open a disk layer rooted at `root`. A failure to create the
    /// directory is logged and tolerated; reads and writes will simply miss.
    pub fn new(root: PathBuf, ttl: Duration) -> Self {
        if let Err(error) = fs::create_dir_all(&root) {
            warn!(
                target = "hemolist::cache::disk",
                root = %root.display(),
                error = %error,
                "failed to create cache directory; layer will degrade to misses"
            );
        }
        Self { root, ttl }
    }

    fn path_for(&self, key: &ListKey) -> PathBuf {
        self.root.join(format!("{}{BLOB_SUFFIX}", key.stem()))
    }

    pub fn get(&self, key: &ListKey) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(
                    target = "hemolist::cache::disk",
                    path = %path.display(),
                    error = %error,
                    "failed to read cache blob"
                );
                return None;
            }
        };

        let entry = match decode_entry(&bytes) {
            Ok(entry) => entry,
            Err(detail) => {
                warn!(
                    target = "hemolist::cache::disk",
                    path = %path.display(),
                    detail = %detail,
                    "discarding undecodable cache blob"
                );
                self.remove_path(&path);
                return None;
            }
        };

        if entry.is_expired(self.ttl) {
            debug!(
                target = "hemolist::cache::disk",
                key = %key,
                "cache blob expired"
            );
            self.remove_path(&path);
            return None;
        }

        Some(entry)
    }

    /// Write an entry atomically. Storage faults are logged and swallowed.
    pub fn put(&self, entry: &CacheEntry) {
        let path = self.path_for(&entry.key);
        let bytes = match encode_entry(entry) {
            Ok(bytes) => bytes,
            Err(detail) => {
                warn!(
                    target = "hemolist::cache::disk",
                    key = %entry.key,
                    detail = %detail,
                    "failed to encode cache entry"
                );
                return;
            }
        };

        if let Err(detail) = self.write_atomic(&path, &bytes) {
            warn!(
                target = "hemolist::cache::disk",
                path = %path.display(),
                detail = %detail,
                "failed to persist cache blob"
            );
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), String> {
        let mut temp =
            tempfile::NamedTempFile::new_in(&self.root).map_err(|err| err.to_string())?;
        temp.write_all(bytes).map_err(|err| err.to_string())?;
        temp.persist(path).map_err(|err| err.to_string())?;
        Ok(())
    }

    pub fn remove(&self, key: &ListKey) {
        self.remove_path(&self.path_for(key));
    }

    fn remove_path(&self, path: &Path) {
        if let Err(error) = fs::remove_file(path)
            && error.kind() != ErrorKind::NotFound
        {
            warn!(
                target = "hemolist::cache::disk",
                path = %path.display(),
                error = %error,
                "failed to remove cache blob"
            );
        }
    }

    /// Enumerate the durable entries and delete those whose stem matches.
    /// Returns the number of blobs removed; an unreadable directory counts
    /// as zero matches.
    pub fn purge_matching(&self, matcher: &GlobMatcher) -> usize {
        let reader = match fs::read_dir(&self.root) {
            Ok(reader) => reader,
            Err(error) => {
                warn!(
                    target = "hemolist::cache::disk",
                    root = %self.root.display(),
                    error = %error,
                    "failed to enumerate cache directory for purge"
                );
                return 0;
            }
        };

        let mut removed = 0;
        for dir_entry in reader.flatten() {
            let name = dir_entry.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(BLOB_SUFFIX)) else {
                continue;
            };
            if matcher.is_match(stem) {
                self.remove_path(&dir_entry.path());
                removed += 1;
            }
        }
        removed
    }
}

fn encode_entry(entry: &CacheEntry) -> Result<Vec<u8>, String> {
    let json = serde_json::to_vec(entry).map_err(|err| err.to_string())?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(|err| err.to_string())?;
    encoder.finish().map_err(|err| err.to_string())
}

fn decode_entry(bytes: &[u8]) -> Result<CacheEntry, String> {
    let mut json = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut json)
        .map_err(|err| err.to_string())?;
    serde_json::from_slice(&json).map_err(|err| err.to_string())
}
