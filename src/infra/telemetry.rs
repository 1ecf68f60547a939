use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "hemolist_cache_l1_hit_total",
            Unit::Count,
            "Total number of in-process cache hits."
        );
        describe_counter!(
            "hemolist_cache_l2_hit_total",
            Unit::Count,
            "Total number of durable blob-cache hits."
        );
        describe_counter!(
            "hemolist_cache_l3_hit_total",
            Unit::Count,
            "Total number of shared-layer cache hits."
        );
        describe_counter!(
            "hemolist_cache_miss_total",
            Unit::Count,
            "Total number of requests that missed every cache layer."
        );
        describe_counter!(
            "hemolist_cache_bypass_total",
            Unit::Count,
            "Total number of high-churn requests that bypassed the cache."
        );
        describe_counter!(
            "hemolist_cache_fingerprint_unavailable_total",
            Unit::Count,
            "Total number of lookups treated as misses because no data fingerprint was available."
        );
        describe_counter!(
            "hemolist_cache_stale_purged_total",
            Unit::Count,
            "Total number of entries purged on read due to a fingerprint mismatch."
        );
        describe_counter!(
            "hemolist_producer_failure_total",
            Unit::Count,
            "Total number of individual producer fetch failures."
        );
        describe_counter!(
            "hemolist_fingerprint_refresh_failure_total",
            Unit::Count,
            "Total number of failed data-fingerprint refresh probes."
        );
        describe_counter!(
            "hemolist_warm_total",
            Unit::Count,
            "Total number of scheduled cache-warming fetches."
        );
        describe_counter!(
            "hemolist_warm_failure_total",
            Unit::Count,
            "Total number of warming fetches that failed or timed out."
        );
    });
}
