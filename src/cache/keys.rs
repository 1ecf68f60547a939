//! Cache key construction.
//!
//! A `ListKey` pins down one cached view: the result set, the page, and a
//! stable hash over every other query parameter. Building a key is a pure
//! function; the same logical request always yields the same key no matter
//! how the caller ordered its parameters.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::ResultSet;

/// Page number used for entries that hold the whole unpaginated result set.
///
/// Producers in this service return complete result sets, so one entry per
/// result set serves every page; per-page keys remain available for result
/// sets whose producers paginate upstream.
pub const WHOLE_SET_PAGE: u32 = 0;

/// Truncated hex length of the parameter hash.
const PARAMS_HASH_LEN: usize = 16;

/// Identity of one cached list view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListKey {
    result_set: ResultSet,
    page: u32,
    params_hash: String,
}

impl ListKey {
    /// Build a per-page key. A requested page of zero is clamped to one.
    pub fn build(result_set: ResultSet, page: u32, params: &[(String, String)]) -> Self {
        Self {
            result_set,
            page: page.max(1),
            params_hash: hash_params(params),
        }
    }

    /// Build the whole-result-set key that serves every page of a filter.
    pub fn whole(result_set: ResultSet, params: &[(String, String)]) -> Self {
        Self {
            result_set,
            page: WHOLE_SET_PAGE,
            params_hash: hash_params(params),
        }
    }

    pub fn result_set(&self) -> ResultSet {
        self.result_set
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn params_hash(&self) -> &str {
        &self.params_hash
    }

    /// Stable string form used as the durable file stem and as the target of
    /// pattern-based purges, e.g. `donors:pending:0:9f86d081884c7d65`.
    pub fn stem(&self) -> String {
        format!(
            "donors:{}:{}:{}",
            self.result_set, self.page, self.params_hash
        )
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}

/// Hash a parameter set order-independently.
///
/// Pairs are sorted by key then value before hashing, so `?a=1&b=2` and
/// `?b=2&a=1` produce the same digest. The page parameter must already have
/// been stripped by the caller.
pub fn hash_params(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for (name, value) in sorted {
        hasher.update(name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1e]);
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..PARAMS_HASH_LEN / 2])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn key_is_order_independent() {
        let a = ListKey::build(
            ResultSet::Pending,
            2,
            &params(&[("center", "north"), ("q", "smith")]),
        );
        let b = ListKey::build(
            ResultSet::Pending,
            2,
            &params(&[("q", "smith"), ("center", "north")]),
        );
        assert_eq!(a, b);
        assert_eq!(a.stem(), b.stem());
    }

    #[test]
    fn different_pages_never_collide() {
        let p1 = ListKey::build(ResultSet::All, 1, &[]);
        let p2 = ListKey::build(ResultSet::All, 2, &[]);
        assert_ne!(p1, p2);
    }

    #[test]
    fn different_result_sets_never_collide() {
        let all = ListKey::whole(ResultSet::All, &[]);
        let pending = ListKey::whole(ResultSet::Pending, &[]);
        assert_ne!(all.stem(), pending.stem());
    }

    #[test]
    fn page_zero_clamps_to_one() {
        let key = ListKey::build(ResultSet::All, 0, &[]);
        assert_eq!(key.page(), 1);
    }

    #[test]
    fn whole_set_key_uses_reserved_page() {
        let key = ListKey::whole(ResultSet::Approved, &[]);
        assert_eq!(key.page(), WHOLE_SET_PAGE);
        assert!(key.stem().starts_with("donors:approved:0:"));
    }

    #[test]
    fn param_values_participate_in_the_hash() {
        let a = ListKey::whole(ResultSet::All, &params(&[("q", "smith")]));
        let b = ListKey::whole(ResultSet::All, &params(&[("q", "jones")]));
        assert_ne!(a, b);
    }

    #[test]
    fn delimiters_prevent_concatenation_collisions() {
        let a = hash_params(&params(&[("ab", "c")]));
        let b = hash_params(&params(&[("a", "bc")]));
        assert_ne!(a, b);
    }
}
