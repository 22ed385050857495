//! Series view caching with freshness checking.
//!
//! Series requests always ask for "the newest N observations", so a cached
//! view goes stale as soon as the sensor reports again. Before serving a
//! hit we ask the server for the datastream's single latest observation
//! (a `$top=1` query) and compare it to the newest reading in the cached
//! view:
//!
//! | Latest upstream reading | Action |
//! |-------------------------|--------|
//! | newer than cached | invalidate, fetch fresh |
//! | same or older | serve cached |
//! | lookup failed | serve cached |
//!
//! Entries also expire via TTL and are evicted by approximate byte size.

use axum::{
    http::{HeaderValue, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::frost::models::IotId;
use crate::pipeline::SeriesPoint;
use crate::services::dashboard::SeriesView;

/// Cached view with the metadata needed for freshness checks
#[derive(Clone)]
pub struct CachedSeries {
    pub view: Arc<SeriesView>,
    pub max_time: Option<DateTime<Utc>>,
}

/// Key is request params, weighted by the approximate size of the view.
pub type SeriesCache = Cache<String, CachedSeries>;

/// Approximate heap footprint of a cached view in bytes.
fn weigh(value: &CachedSeries) -> u32 {
    let points = value.view.points.len() * std::mem::size_of::<SeriesPoint>();
    let text = value.view.name.len() + value.view.description.len() + 512;
    (points + text).try_into().unwrap_or(u32::MAX)
}

#[must_use]
pub fn build_cache(max_bytes: u64, ttl_seconds: u64) -> SeriesCache {
    Cache::builder()
        .weigher(|_key: &String, value: &CachedSeries| -> u32 { weigh(value) })
        .max_capacity(max_bytes)
        .time_to_live(Duration::from_secs(ttl_seconds))
        .support_invalidation_closures()
        .build()
}

/// Build a cache key from a prefix and components.
///
/// Components are joined with `:` separator. Empty components are included
/// to ensure different queries produce different keys.
pub fn cache_key(prefix: &str, components: &[&str]) -> String {
    let mut key = prefix.to_string();
    for c in components {
        key.push(':');
        key.push_str(c);
    }
    key
}

/// Whether an upstream reading at `latest` makes a view ending at
/// `cached_max` stale.
#[must_use]
pub fn is_stale(cached_max: Option<DateTime<Utc>>, latest: Option<DateTime<Utc>>) -> bool {
    match (cached_max, latest) {
        (Some(cached), Some(latest)) => latest > cached,
        (None, Some(_)) => true,
        (_, None) => false,
    }
}

/// Try to get a cached view, dropping it if the datastream has reported
/// since it was cached.
pub async fn get_cached(
    state: &AppState,
    cache_key: &str,
    datastream_id: &IotId,
) -> Option<Arc<SeriesView>> {
    let cached = state.series_cache.get(cache_key).await?;

    if let Ok(Some(record)) = state.frost_client.get_latest_observation(datastream_id).await {
        let latest = record.timestamp();
        if is_stale(cached.max_time, latest) {
            tracing::debug!(
                cache_key = %cache_key,
                cached_max = ?cached.max_time,
                latest = ?latest,
                "cache_stale"
            );
            state.series_cache.invalidate(cache_key).await;
            return None;
        }
    }

    tracing::debug!(cache_key = %cache_key, "cache_hit");
    Some(cached.view)
}

/// Store a view in cache.
pub async fn store_cached(state: &AppState, cache_key: String, view: Arc<SeriesView>) {
    let points = view.points.len();
    let max_time = view.latest_time;
    state
        .series_cache
        .insert(cache_key.clone(), CachedSeries { view, max_time })
        .await;

    tracing::debug!(
        cache_key = %cache_key,
        points,
        max_time = ?max_time,
        "cache_stored"
    );
}

/// Build a response with X-Cache header indicating hit/miss status.
pub fn cached_response(data: Vec<u8>, content_type: &'static str, cache_hit: bool) -> AppResult<Response> {
    let cache_header = if cache_hit { "HIT" } else { "MISS" };
    Response::builder()
        .header(header::CONTENT_TYPE, HeaderValue::from_static(content_type))
        .header("X-Cache", HeaderValue::from_static(cache_header))
        .body(axum::body::Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Invalidate all cache entries matching a prefix.
pub fn invalidate_prefix(state: &AppState, prefix: &str) {
    let prefix_owned = prefix.to_string();
    let _ = state
        .series_cache
        .invalidate_entries_if(move |key, _| key.starts_with(&prefix_owned));
    tracing::debug!(prefix = %prefix, "cache_prefix_invalidated");
}
