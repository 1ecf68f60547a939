//! Producer collaborator contract.
//!
//! A producer yields the raw records for one result set. The concrete
//! implementation talks to the upstream registry backend
//! (`infra::upstream::RestProducer`); tests substitute in-memory producers.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{Record, ResultSet};

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream returned status {status}")]
    Status { status: u16 },
    #[error("upstream payload could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait Producer: Send + Sync {
    /// The result set this producer yields records for.
    fn result_set(&self) -> ResultSet;

    /// Fetch the full record set. Order is not guaranteed; the orchestrator
    /// applies the total order after aggregation.
    async fn fetch(&self) -> Result<Vec<Record>, ProducerError>;

    /// The most recent mutation visible upstream for this producer's
    /// sources. Feeds the data fingerprint; `None` means the source has no
    /// timestamped rows.
    async fn latest_mutation(&self) -> Result<Option<OffsetDateTime>, ProducerError>;
}
