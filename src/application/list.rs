//! List service: the cache-aware read path of the donor list endpoint.
//!
//! One call runs the whole flow: key build → layered lookup → fetch on
//! miss → populate → paginate → content tag. Cache behavior is driven
//! entirely by the explicit [`CacheRequestOptions`] value; nothing in here
//! reads ambient request state.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};

use super::fetch::{FetchError, FetchOrchestrator};
use super::pagination::{PageInfo, paginate};
use crate::cache::{
    CacheConfig, CacheEntry, CacheLayer, CacheStatus, Invalidator, LayeredStore, ListKey, etag,
};
use crate::domain::{Record, ResultSet};

/// Explicit per-request cache options. Constructed at the HTTP boundary and
/// passed through every cache-aware call.
#[derive(Debug, Clone)]
pub struct CacheRequestOptions {
    pub result_set: ResultSet,
    pub page: u32,
    /// Query parameters other than the page number; participate in the key.
    pub params: Vec<(String, String)>,
    /// Bypass every layer and purge the result set before re-fetching.
    pub force_refresh: bool,
    /// Warm-trigger marker: populate the cache, skip body rendering.
    pub warm_only: bool,
}

impl CacheRequestOptions {
    pub fn new(result_set: ResultSet, page: u32) -> Self {
        Self {
            result_set,
            page: page.max(1),
            params: Vec::new(),
            force_refresh: false,
            warm_only: false,
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }

    pub fn warm_only(mut self) -> Self {
        self.warm_only = true;
        self
    }
}

/// One served page plus the cache diagnostics the endpoint exposes.
#[derive(Debug, Clone)]
pub struct ListPage {
    pub records: Vec<Record>,
    pub page_info: PageInfo,
    pub cache_status: CacheStatus,
    pub cache_source: Option<CacheLayer>,
    pub degraded: bool,
    pub content_tag: String,
}

pub struct ListService {
    store: Arc<LayeredStore>,
    fetcher: Arc<FetchOrchestrator>,
    invalidator: Invalidator,
    config: CacheConfig,
}

impl ListService {
    pub fn new(
        store: Arc<LayeredStore>,
        fetcher: Arc<FetchOrchestrator>,
        config: CacheConfig,
    ) -> Self {
        let invalidator = Invalidator::new(Arc::clone(&store));
        Self {
            store,
            fetcher,
            invalidator,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Serve one page of one result set, consulting and populating the
    /// layered store.
    pub async fn execute(&self, options: &CacheRequestOptions) -> Result<ListPage, FetchError> {
        let key = ListKey::whole(options.result_set, &options.params);

        if options.force_refresh {
            self.invalidator.purge_result_set(options.result_set);
        }

        let hit = if options.force_refresh {
            None
        } else {
            self.store.get(&key)
        };

        let (entry, cache_status, cache_source, degraded) = match hit {
            Some(hit) => (hit.entry, CacheStatus::Hit, Some(hit.source), false),
            None => {
                let outcome = self.fetcher.fetch(options.result_set).await?;
                let degraded = outcome.is_degraded();
                let entry = CacheEntry::new(
                    key,
                    outcome.records,
                    &self.store.fingerprints().current(),
                );
                if degraded {
                    // A partial aggregate must not be served as
                    // authoritative on later requests; the next read retries
                    // the failed producer.
                    debug!(
                        target = "hemolist::list",
                        result_set = %options.result_set,
                        "skipping cache population for degraded fetch"
                    );
                } else {
                    self.store.put(entry.clone());
                }
                (entry, CacheStatus::Miss, None, degraded)
            }
        };

        let paged = paginate(
            &entry.records,
            options.page,
            self.config.page_size_non_zero(),
        );
        let content_tag = etag::page_tag(options.result_set, paged.page, &paged.items);

        Ok(ListPage {
            page_info: paged.info(),
            records: paged.items,
            cache_status,
            cache_source,
            degraded,
            content_tag,
        })
    }

    /// Schedule a data-fingerprint refresh when the cached value has aged
    /// out. Detached and idempotent: at most one probe runs at a time, a
    /// request never waits on it, and a failed probe keeps the last stamp.
    pub fn nudge_fingerprint_refresh(&self) {
        let generator = Arc::clone(self.store.fingerprints());
        if !generator.data_is_stale() || !generator.try_begin_refresh() {
            return;
        }

        let fetcher = Arc::clone(&self.fetcher);
        tokio::spawn(async move {
            match fetcher.probe_latest_mutation().await {
                Ok(latest) => generator.record_latest_mutation(latest),
                Err(error) => {
                    warn!(
                        target = "hemolist::list",
                        error = %error,
                        "data fingerprint refresh failed; keeping previous value"
                    );
                    counter!("hemolist_fingerprint_refresh_failure_total").increment(1);
                }
            }
            generator.end_refresh();
        });
    }
}
