use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;

use crate::application::error::HttpError;
use crate::application::list::{CacheRequestOptions, ListPage, ListService};
use crate::application::warm::Warmer;
use crate::cache::etag;
use crate::domain::ResultSet;

use super::middleware;

#[derive(Clone)]
pub struct HttpState {
    pub list: Arc<ListService>,
    pub warmer: Arc<Warmer>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/donors", get(list_donors))
        .route("/_health", get(health))
        .layer(axum::middleware::from_fn(middleware::log_responses))
        .layer(axum::middleware::from_fn(middleware::set_request_context))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn list_donors(
    State(state): State<HttpState>,
    Query(raw_params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let start = Instant::now();

    let options = match parse_options(&raw_params) {
        Ok(options) => options,
        Err(error) => return error.into_response(),
    };

    let page = match state.list.execute(&options).await {
        Ok(page) => page,
        Err(error) => return HttpError::from(error).into_response(),
    };

    // Both run detached; the response does not wait on them.
    state.warmer.schedule(&options);
    state.list.nudge_fingerprint_refresh();

    if options.warm_only {
        return StatusCode::NO_CONTENT.into_response();
    }

    if let Some(caller_tag) = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        && etag::matches(&page.content_tag, caller_tag)
    {
        let mut response = StatusCode::NOT_MODIFIED.into_response();
        apply_cache_headers(&mut response, &page, start);
        return response;
    }

    let body = json!({
        "data": page.records,
        "pagination": page.page_info,
        "cache_status": page.cache_status.as_str(),
        "cache_source": page.cache_source.map_or("none", |layer| layer.as_str()),
        "degraded": page.degraded,
    });

    let mut response = (StatusCode::OK, Json(body)).into_response();
    apply_cache_headers(&mut response, &page, start);
    response
}

fn parse_options(raw_params: &[(String, String)]) -> Result<CacheRequestOptions, HttpError> {
    let mut set = ResultSet::All;
    let mut page: u32 = 1;
    let mut force_refresh = false;
    let mut warm_only = false;
    let mut params = Vec::new();

    for (name, value) in raw_params {
        match name.as_str() {
            "set" => set = ResultSet::from_str(value)?,
            "page" => page = value.parse().unwrap_or(1),
            "refresh" => force_refresh = flag(value),
            "warm" => warm_only = flag(value),
            _ => params.push((name.clone(), value.clone())),
        }
    }

    let mut options = CacheRequestOptions::new(set, page).with_params(params);
    if force_refresh {
        options = options.force_refresh();
    }
    if warm_only {
        options = options.warm_only();
    }
    Ok(options)
}

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true")
}

fn apply_cache_headers(response: &mut Response, page: &ListPage, start: Instant) {
    let headers = response.headers_mut();
    headers.insert(
        "X-Cache",
        HeaderValue::from_static(page.cache_status.as_str()),
    );
    if let Some(source) = page.cache_source {
        headers.insert("X-Cache-Source", HeaderValue::from_static(source.as_str()));
    }
    if let Ok(value) = HeaderValue::from_str(&start.elapsed().as_millis().to_string()) {
        headers.insert("X-Runtime-Ms", value);
    }
    if let Ok(value) = HeaderValue::from_str(&etag::header_value(&page.content_tag)) {
        headers.insert(header::ETAG, value);
    }
}
