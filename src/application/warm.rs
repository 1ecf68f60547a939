//! Post-response cache warming.
//!
//! After a page is served, the warmer pre-populates the result sets an
//! operator is likely to open next. Warming calls run in-process against
//! [`ListService`], detached from the serving request, each bounded by a
//! timeout. A warming failure never surfaces to a caller.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::debug;

use super::list::{CacheRequestOptions, ListService};
use crate::domain::ResultSet;

pub struct Warmer {
    service: Arc<ListService>,
    timeout: Duration,
    enabled: bool,
}

impl Warmer {
    pub fn new(service: Arc<ListService>, timeout: Duration, enabled: bool) -> Self {
        Self {
            service,
            timeout,
            enabled,
        }
    }

    /// Queue warming work derived from a just-served request. Returns
    /// immediately; the actual population happens on detached tasks.
    pub fn schedule(&self, served: &CacheRequestOptions) {
        if !self.enabled {
            return;
        }
        // A warm-triggered request must not fan out further.
        if served.warm_only {
            return;
        }

        for target in self.targets(served) {
            let service = Arc::clone(&self.service);
            let timeout = self.timeout;
            tokio::spawn(async move {
                counter!("hemolist_warm_total").increment(1);
                match tokio::time::timeout(timeout, service.execute(&target)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(error)) => {
                        debug!(
                            target = "hemolist::warm",
                            result_set = %target.result_set,
                            error = %error,
                            "warming fetch failed"
                        );
                        counter!("hemolist_warm_failure_total").increment(1);
                    }
                    Err(_) => {
                        debug!(
                            target = "hemolist::warm",
                            result_set = %target.result_set,
                            timeout_ms = timeout.as_millis() as u64,
                            "warming fetch timed out"
                        );
                        counter!("hemolist_warm_failure_total").increment(1);
                    }
                }
            });
        }
    }

    /// The other cacheable result sets, with the serving request's filter
    /// params carried over. High-churn sets are skipped since their pages
    /// are never cached.
    fn targets(&self, served: &CacheRequestOptions) -> Vec<CacheRequestOptions> {
        ResultSet::ALL_SETS
            .iter()
            .filter(|set| **set != served.result_set)
            .filter(|set| !self.service.config().is_high_churn(**set))
            .map(|set| {
                CacheRequestOptions::new(*set, 1)
                    .with_params(served.params.clone())
                    .warm_only()
            })
            .collect()
    }
}
