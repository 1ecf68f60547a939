//! Donor-record domain types.
//!
//! The cache layer treats a record as an opaque JSON object; the only
//! structure it relies on is a stable identifier and an optional sortable
//! timestamp. Everything else rides along in `fields`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

/// Filtered sub-views of the donor list exposed by the dashboard.
///
/// Each non-aggregate set is backed by one upstream producer; `All` is the
/// concatenation of every producer's output under a single total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSet {
    All,
    Pending,
    Approved,
    Deferred,
}

impl ResultSet {
    /// Every result set the service serves, aggregate view first.
    pub const ALL_SETS: [ResultSet; 4] = [
        ResultSet::All,
        ResultSet::Pending,
        ResultSet::Approved,
        ResultSet::Deferred,
    ];

    /// The sets that have a dedicated upstream producer.
    pub const PRODUCER_SETS: [ResultSet; 3] =
        [ResultSet::Pending, ResultSet::Approved, ResultSet::Deferred];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultSet::All => "all",
            ResultSet::Pending => "pending",
            ResultSet::Approved => "approved",
            ResultSet::Deferred => "deferred",
        }
    }
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown result set `{0}`")]
pub struct UnknownResultSet(pub String);

impl FromStr for ResultSet {
    type Err = UnknownResultSet;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(ResultSet::All),
            "pending" => Ok(ResultSet::Pending),
            "approved" => Ok(ResultSet::Approved),
            "deferred" => Ok(ResultSet::Deferred),
            other => Err(UnknownResultSet(other.to_string())),
        }
    }
}

/// One donor record as served by the list endpoint.
///
/// `updated_at` is the sort key; records without one sort after all records
/// that have one. The remaining upstream columns are carried verbatim in
/// `fields` and serialized flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, updated_at: Option<OffsetDateTime>) -> Self {
        Self {
            id: id.into(),
            updated_at,
            fields: serde_json::Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_set_round_trips_through_str() {
        for set in ResultSet::ALL_SETS {
            assert_eq!(set.as_str().parse::<ResultSet>().unwrap(), set);
        }
    }

    #[test]
    fn unknown_result_set_is_rejected() {
        let err = "screening!".parse::<ResultSet>().unwrap_err();
        assert!(err.to_string().contains("screening!"));
    }

    #[test]
    fn record_serializes_extra_fields_flat() {
        let mut record = Record::new("d-1", None);
        record
            .fields
            .insert("blood_type".to_string(), serde_json::json!("O-"));

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["id"], "d-1");
        assert_eq!(value["blood_type"], "O-");
    }

    #[test]
    fn record_deserializes_unknown_columns_into_fields() {
        let record: Record = serde_json::from_str(
            r#"{"id":"d-2","updated_at":"2026-08-01T10:00:00Z","stage":"screening"}"#,
        )
        .unwrap();
        assert_eq!(record.id, "d-2");
        assert!(record.updated_at.is_some());
        assert_eq!(record.fields["stage"], "screening");
    }
}
