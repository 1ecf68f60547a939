//! REST client for the donor registry backend.
//!
//! One [`RestProducer`] per filtered result set. The shared client carries
//! connect and total timeouts so a stalled upstream can never wedge a
//! request or a warming task.

use async_trait::async_trait;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::producers::{Producer, ProducerError};
use crate::config::UpstreamSettings;
use crate::domain::{Record, ResultSet};

use super::error::InfraError;

/// Build the shared HTTP client from validated upstream settings.
pub fn build_client(settings: &UpstreamSettings) -> Result<reqwest::Client, InfraError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout())
        .timeout(settings.total_timeout())
        .build()
        .map_err(|err| InfraError::upstream(format!("failed to build http client: {err}")))
}

pub struct RestProducer {
    client: reqwest::Client,
    base_url: String,
    set: ResultSet,
}

impl RestProducer {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, set: ResultSet) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            set,
        }
    }

    /// One producer per backend status filter.
    pub fn for_all_sets(client: &reqwest::Client, base_url: &str) -> Vec<Self> {
        ResultSet::PRODUCER_SETS
            .iter()
            .map(|set| Self::new(client.clone(), base_url, *set))
            .collect()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ProducerError> {
        let url = format!(
            "{}{}?status={}",
            self.base_url,
            path,
            self.set.as_str()
        );
        debug!(target = "hemolist::upstream", url = %url, "upstream request");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| ProducerError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProducerError::Status {
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|err| ProducerError::Decode(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct LatestChange {
    #[serde(with = "time::serde::rfc3339::option")]
    changed_at: Option<OffsetDateTime>,
}

#[async_trait]
impl Producer for RestProducer {
    fn result_set(&self) -> ResultSet {
        self.set
    }

    async fn fetch(&self) -> Result<Vec<Record>, ProducerError> {
        self.get_json("/donors").await
    }

    async fn latest_mutation(&self) -> Result<Option<OffsetDateTime>, ProducerError> {
        let latest: LatestChange = self.get_json("/donors/latest-change").await?;
        Ok(latest.changed_at)
    }
}
