//! End-to-end tests for the donor list endpoint, exercising the full router
//! with in-memory producers in place of the upstream registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use time::OffsetDateTime;
use time::macros::datetime;
use tower::ServiceExt;

use hemolist::application::fetch::FetchOrchestrator;
use hemolist::application::list::ListService;
use hemolist::application::producers::{Producer, ProducerError};
use hemolist::application::warm::Warmer;
use hemolist::cache::{CacheConfig, FingerprintGenerator, LayeredStore};
use hemolist::domain::{Record, ResultSet};
use hemolist::infra::http::{HttpState, build_router};

struct StubProducer {
    set: ResultSet,
    records: Vec<Record>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl StubProducer {
    fn new(set: ResultSet, count: usize) -> Arc<Self> {
        let records = (0..count)
            .map(|i| {
                Record::new(
                    format!("{set}-{i:03}"),
                    Some(datetime!(2026-08-01 00:00 UTC) + Duration::from_secs(i as u64)),
                )
            })
            .collect();
        Arc::new(Self {
            set,
            records,
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Producer for StubProducer {
    fn result_set(&self) -> ResultSet {
        self.set
    }

    async fn fetch(&self) -> Result<Vec<Record>, ProducerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            Err(ProducerError::Status { status: 503 })
        } else {
            Ok(self.records.clone())
        }
    }

    async fn latest_mutation(&self) -> Result<Option<OffsetDateTime>, ProducerError> {
        Ok(self.records.iter().filter_map(|r| r.updated_at).max())
    }
}

struct Harness {
    router: Router,
    producers: Vec<Arc<StubProducer>>,
    _cache_dir: tempfile::TempDir,
}

fn harness_with(config: CacheConfig, counts: [usize; 3]) -> Harness {
    let cache_dir = tempfile::tempdir().expect("temp cache dir");
    let config = CacheConfig {
        l2_dir: cache_dir.path().to_path_buf(),
        ..config
    };

    let producers: Vec<Arc<StubProducer>> = ResultSet::PRODUCER_SETS
        .iter()
        .zip(counts)
        .map(|(set, count)| StubProducer::new(*set, count))
        .collect();
    let dyn_producers: Vec<Arc<dyn Producer>> = producers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn Producer>)
        .collect();

    let generator = Arc::new(FingerprintGenerator::with_build(
        "build-1".to_string(),
        Duration::from_secs(60),
    ));
    generator.record_latest_mutation(Some(datetime!(2026-08-01 12:00 UTC)));

    let store = Arc::new(LayeredStore::new(config.clone(), generator));
    let service = Arc::new(ListService::new(
        store,
        Arc::new(FetchOrchestrator::new(dyn_producers)),
        config.clone(),
    ));
    let warmer = Arc::new(Warmer::new(
        Arc::clone(&service),
        config.warm_timeout(),
        config.warm_enabled,
    ));

    Harness {
        router: build_router(HttpState {
            list: service,
            warmer,
        }),
        producers,
        _cache_dir: cache_dir,
    }
}

fn harness() -> Harness {
    harness_with(
        CacheConfig {
            high_churn_sets: vec![],
            warm_enabled: false,
            ..Default::default()
        },
        [10, 10, 10],
    )
}

async fn get(router: &Router, uri: &str) -> axum::response::Response {
    router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

fn header_value<'a>(response: &'a axum::response::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn miss_then_hit_with_diagnostic_headers() {
    let harness = harness();

    let first = get(&harness.router, "/donors?set=approved").await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_value(&first, "X-Cache"), Some("MISS"));
    assert!(header_value(&first, "X-Runtime-Ms").is_some());
    assert!(first.headers().get(header::ETAG).is_some());

    let second = get(&harness.router, "/donors?set=approved").await;
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_value(&second, "X-Cache"), Some("HIT"));
    assert_eq!(header_value(&second, "X-Cache-Source"), Some("l1"));
}

#[tokio::test]
async fn response_body_carries_data_and_pagination() {
    let harness = harness_with(
        CacheConfig {
            page_size: 4,
            high_churn_sets: vec![],
            warm_enabled: false,
            ..Default::default()
        },
        [10, 0, 0],
    );

    let response = get(&harness.router, "/donors?set=pending&page=3").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["pagination"]["page"], 3);
    assert_eq!(body["pagination"]["total_pages"], 3);
    assert_eq!(body["pagination"]["total_items"], 10);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["degraded"], false);
    assert_eq!(body["cache_status"], "MISS");
}

#[tokio::test]
async fn cache_diagnostics_are_top_level_body_fields() {
    let harness = harness();

    let miss = body_json(get(&harness.router, "/donors?set=approved").await).await;
    assert_eq!(miss["cache_status"], "MISS");
    assert_eq!(miss["cache_source"], "none");

    let hit = body_json(get(&harness.router, "/donors?set=approved").await).await;
    assert_eq!(hit["cache_status"], "HIT");
    assert_eq!(hit["cache_source"], "l1");
}

#[tokio::test]
async fn matching_if_none_match_returns_not_modified() {
    let harness = harness();

    let first = get(&harness.router, "/donors?set=approved").await;
    let tag = header_value(&first, "etag").expect("etag header").to_string();

    let conditional = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/donors?set=approved")
                .header(header::IF_NONE_MATCH, &tag)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(conditional.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header_value(&conditional, "X-Cache"), Some("HIT"));
}

#[tokio::test]
async fn stale_if_none_match_returns_full_body() {
    let harness = harness();
    get(&harness.router, "/donors?set=approved").await;

    let conditional = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/donors?set=approved")
                .header(header::IF_NONE_MATCH, "\"0011223344556677\"")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(conditional.status(), StatusCode::OK);
}

#[tokio::test]
async fn warm_trigger_populates_without_a_body() {
    let harness = harness();

    let warm = get(&harness.router, "/donors?set=approved&warm=1").await;
    assert_eq!(warm.status(), StatusCode::NO_CONTENT);

    let follow_up = get(&harness.router, "/donors?set=approved").await;
    assert_eq!(header_value(&follow_up, "X-Cache"), Some("HIT"));
}

#[tokio::test]
async fn refresh_purges_and_refetches() {
    let harness = harness();

    get(&harness.router, "/donors?set=approved").await;
    let approved = &harness.producers[1];
    assert_eq!(approved.calls.load(Ordering::SeqCst), 1);

    let refreshed = get(&harness.router, "/donors?set=approved&refresh=1").await;
    assert_eq!(header_value(&refreshed, "X-Cache"), Some("MISS"));
    assert_eq!(approved.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unknown_set_is_a_client_error() {
    let harness = harness();
    let response = get(&harness.router, "/donors?set=archived").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unknown_result_set");
}

#[tokio::test]
async fn partial_producer_failure_degrades_the_aggregate() {
    let harness = harness_with(
        CacheConfig {
            high_churn_sets: vec![],
            warm_enabled: false,
            ..Default::default()
        },
        [5, 5, 5],
    );
    harness.producers[2].failing.store(true, Ordering::SeqCst);

    let response = get(&harness.router, "/donors?set=all").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["degraded"], true);
    assert_eq!(body["pagination"]["total_items"], 10);
}

#[tokio::test]
async fn every_producer_failing_is_a_bad_gateway() {
    let harness = harness();
    for producer in &harness.producers {
        producer.failing.store(true, Ordering::SeqCst);
    }

    let response = get(&harness.router, "/donors?set=all").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "upstream_unavailable");
    assert_eq!(body["error"]["message"], "Upstream donor source unavailable");
}

#[tokio::test]
async fn filter_params_partition_the_cache() {
    let harness = harness();

    get(&harness.router, "/donors?set=approved&blood_type=0-").await;
    let other = get(&harness.router, "/donors?set=approved&blood_type=AB%2B").await;
    assert_eq!(header_value(&other, "X-Cache"), Some("MISS"));

    // Same filter in a different parameter order is the same entry.
    get(&harness.router, "/donors?set=approved&blood_type=0-&region=north").await;
    let reordered = get(
        &harness.router,
        "/donors?set=approved&region=north&blood_type=0-",
    )
    .await;
    assert_eq!(header_value(&reordered, "X-Cache"), Some("HIT"));
}

#[tokio::test]
async fn health_endpoint_responds() {
    let harness = harness();
    let response = get(&harness.router, "/_health").await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
