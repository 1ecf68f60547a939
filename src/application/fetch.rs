//! Fetch orchestrator.
//!
//! On a full cache miss, invokes the producers for the requested result set
//! (all of them concurrently for the aggregate view), concatenates their
//! output, and applies the total order. One failing producer degrades the
//! result; the request only fails when every producer does.

use std::cmp::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::warn;

use super::producers::Producer;
use crate::domain::{Record, ResultSet};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("every producer failed for result set `{result_set}`: {reasons:?}")]
    AllProducersFailed {
        result_set: ResultSet,
        reasons: Vec<String>,
    },
}

/// Aggregated fetch result. `failed_sets` names producers that were skipped
/// over; the records are complete for every producer that succeeded.
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    pub failed_sets: Vec<ResultSet>,
}

impl FetchOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failed_sets.is_empty()
    }
}

pub struct FetchOrchestrator {
    producers: Vec<Arc<dyn Producer>>,
}

impl FetchOrchestrator {
    pub fn new(producers: Vec<Arc<dyn Producer>>) -> Self {
        Self { producers }
    }

    fn producers_for(&self, set: ResultSet) -> Vec<&Arc<dyn Producer>> {
        self.producers
            .iter()
            .filter(|producer| set == ResultSet::All || producer.result_set() == set)
            .collect()
    }

    /// Fetch and order the full record set for one filter.
    ///
    /// A partial failure is recorded and degraded over; the explicit error
    /// is reserved for the case where no producer yielded anything, since an
    /// empty success must never masquerade as authoritative data.
    pub async fn fetch(&self, set: ResultSet) -> Result<FetchOutcome, FetchError> {
        let selected = self.producers_for(set);
        if selected.is_empty() {
            return Err(FetchError::AllProducersFailed {
                result_set: set,
                reasons: vec!["no producer registered".to_string()],
            });
        }

        let results = join_all(selected.iter().map(|producer| producer.fetch())).await;

        let mut records = Vec::new();
        let mut failed_sets = Vec::new();
        let mut reasons = Vec::new();
        for (producer, result) in selected.iter().zip(results) {
            match result {
                Ok(batch) => records.extend(batch),
                Err(error) => {
                    warn!(
                        target = "hemolist::fetch",
                        producer = %producer.result_set(),
                        error = %error,
                        "producer failed; continuing with remaining producers"
                    );
                    counter!("hemolist_producer_failure_total").increment(1);
                    failed_sets.push(producer.result_set());
                    reasons.push(error.to_string());
                }
            }
        }

        if failed_sets.len() == selected.len() {
            return Err(FetchError::AllProducersFailed {
                result_set: set,
                reasons,
            });
        }

        sort_records(&mut records);
        Ok(FetchOutcome {
            records,
            failed_sets,
        })
    }

    /// Probe every producer for its latest mutation stamp and return the
    /// most recent one. Individual probe failures are tolerated as long as
    /// at least one producer answered.
    pub async fn probe_latest_mutation(&self) -> Result<Option<OffsetDateTime>, FetchError> {
        let results = join_all(
            self.producers
                .iter()
                .map(|producer| producer.latest_mutation()),
        )
        .await;

        let mut latest = None;
        let mut answered = false;
        let mut reasons = Vec::new();
        for (producer, result) in self.producers.iter().zip(results) {
            match result {
                Ok(stamp) => {
                    answered = true;
                    latest = match (latest, stamp) {
                        (Some(a), Some(b)) => Some(if b > a { b } else { a }),
                        (existing, probed) => probed.or(existing),
                    };
                }
                Err(error) => {
                    warn!(
                        target = "hemolist::fetch",
                        producer = %producer.result_set(),
                        error = %error,
                        "mutation probe failed"
                    );
                    reasons.push(error.to_string());
                }
            }
        }

        if answered {
            Ok(latest)
        } else {
            Err(FetchError::AllProducersFailed {
                result_set: ResultSet::All,
                reasons,
            })
        }
    }
}

/// Total order of the aggregated list: newest first by `updated_at`, with
/// records lacking a timestamp after every record that has one. The sort is
/// stable, so equal-keyed records keep their producer order.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by(|a, b| match (a.updated_at, b.updated_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}
