//! Conditional-response gate.
//!
//! Fingerprints the page actually being returned (result set, page number,
//! and the ordered record identifiers on that page) so a poller that
//! already holds the current tag gets an empty not-modified response
//! instead of a re-rendered body. The tag is computed after pagination
//! slicing and before response serialization.

use sha2::{Digest, Sha256};

use crate::domain::{Record, ResultSet};

/// Truncated hex length of a content tag.
const TAG_LEN: usize = 16;

/// Content fingerprint of one rendered page.
pub fn page_tag(set: ResultSet, page: u32, records: &[Record]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(set.as_str().as_bytes());
    hasher.update([0x1f]);
    hasher.update(page.to_be_bytes());
    for record in records {
        hasher.update([0x1e]);
        hasher.update(record.id.as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..TAG_LEN / 2])
}

/// Strong entity-tag header value for a content tag.
pub fn header_value(tag: &str) -> String {
    format!("\"{tag}\"")
}

/// Exact-match comparison against a caller-supplied `If-None-Match` value.
/// Quotes and surrounding whitespace are tolerated; wildcard matching is
/// deliberately not supported.
pub fn matches(tag: &str, caller_tag: &str) -> bool {
    caller_tag.trim().trim_matches('"') == tag
}
