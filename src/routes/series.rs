use axum::{
    Json,
    extract::{Path, Query, State},
    http::header::{self, HeaderMap},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::frost::models::IotId;
use crate::routes::{require_session_id, session_id};
use crate::services::cache;
use crate::services::dashboard::{self, SeriesView};

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

fn determine_format(query_format: &str, headers: &HeaderMap) -> AppResult<Format> {
    // Query parameter takes precedence
    match query_format.to_lowercase().as_str() {
        "json" => {}
        "csv" => return Ok(Format::Csv),
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported format '{other}', expected json or csv"
            )));
        }
    }

    if let Some(accept) = headers.get(header::ACCEPT)
        && let Ok(accept_str) = accept.to_str()
        && accept_str.contains("text/csv")
    {
        return Ok(Format::Csv);
    }

    Ok(Format::Json)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SeriesQuery {
    /// Number of most recent observations to chart (default from configuration)
    pub limit: Option<usize>,
    /// Response format: json (default) or csv
    #[serde(default = "default_format")]
    pub format: String,
}

/// Chart data for a datastream
///
/// Fetches the newest observations, orders them, annotates gaps and computes
/// statistics. With a session id the result also becomes that session's
/// displayed series, unless a newer selection was made while it was loading.
#[utoipa::path(
    get,
    path = "/api/datastreams/{datastream_id}/series",
    params(
        ("datastream_id" = String, Path, description = "Datastream @iot.id"),
        ("x-session-id" = Option<String>, Header, description = "Dashboard session id"),
        SeriesQuery
    ),
    responses(
        (status = 200, description = "Series computed", body = SeriesView),
        (status = 400, description = "Invalid query parameters"),
        (status = 502, description = "SensorThings server unavailable"),
    ),
    tag = "series"
)]
pub async fn get_series(
    State(state): State<AppState>,
    Path(datastream_id): Path<String>,
    Query(query): Query<SeriesQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let format = determine_format(&query.format, &headers)?;
    let session_id = session_id(&headers)?;

    let limit = query.limit.unwrap_or(state.config.observation_limit);
    if limit == 0 || limit > state.config.observation_limit_max {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            state.config.observation_limit_max
        )));
    }

    let id = IotId::parse(&datastream_id);
    let selection = match &session_id {
        Some(sid) => {
            let session = state.sessions.get(sid).await;
            let ticket = session.selection.select(id.clone());
            Some((session, ticket))
        }
        None => None,
    };

    let cache_key = cache::cache_key("series", &[&id.to_string(), &limit.to_string()]);

    let (view, cache_hit) = match cache::get_cached(&state, &cache_key, &id).await {
        Some(view) => (view, true),
        None => {
            let gaps = state.config.gap_config();
            let view = Arc::new(dashboard::load_series(&state.frost_client, &id, limit, &gaps).await?);
            cache::store_cached(&state, cache_key, view.clone()).await;
            (view, false)
        }
    };

    if let Some((session, ticket)) = selection {
        session.selection.commit(&ticket, view.clone()).await;
    }

    match format {
        Format::Csv => cache::cached_response(dashboard::series_csv(&view)?, "text/csv", cache_hit),
        Format::Json => {
            let body = serde_json::to_vec(&*view).map_err(|e| AppError::Internal(e.to_string()))?;
            cache::cached_response(body, "application/json", cache_hit)
        }
    }
}

/// The series currently displayed in this session
#[utoipa::path(
    get,
    path = "/api/selection",
    params(
        ("x-session-id" = String, Header, description = "Dashboard session id"),
    ),
    responses(
        (status = 200, description = "Displayed series", body = SeriesView),
        (status = 400, description = "Missing session id"),
        (status = 404, description = "No series selected yet"),
    ),
    tag = "series"
)]
pub async fn get_selection(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<SeriesView>> {
    let session_id = require_session_id(&headers)?;
    let not_selected = || AppError::NotFound("No datastream selected".to_string());

    let session = state.sessions.existing(&session_id).await.ok_or_else(not_selected)?;
    session
        .selection
        .displayed()
        .await
        .map(|view| Json((*view).clone()))
        .ok_or_else(not_selected)
}
