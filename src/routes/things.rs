use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::frost::models::IotId;
use crate::services::dashboard::{self, DatastreamSummary, ThingSummary};
use crate::routes::session_id;
use crate::session::{FIT_PADDING, MapBounds, RefreshFailure, RefreshKind, fit_bounds};
use crate::sync::worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Warning,
    Error,
}

/// User-facing status line for the dashboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThingsResponse {
    pub things: Vec<ThingSummary>,
    /// Padded extent of all listed things (null if none)
    pub bounds: Option<MapBounds>,
    /// Default map centre `[lat, lon]`
    #[schema(value_type = Vec<f64>)]
    pub center: [f64; 2],
    pub loaded_at: Option<DateTime<Utc>>,
    /// Set while the most recent registry refresh has failed
    pub refresh_failure: Option<RefreshFailure>,
    pub status: StatusMessage,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ThingsQuery {
    /// Case-insensitive name filter
    pub q: Option<String>,
}

async fn things_response(state: &AppState, query: Option<&str>) -> ThingsResponse {
    let registry = &state.registry;
    let things = registry.things_matching(query.unwrap_or("")).await;
    let coordinates: Vec<[f64; 2]> = things.iter().map(|t| t.coordinates).collect();
    let refresh_failure = registry.last_failure().await;

    let status = if let Some(failure) = &refresh_failure {
        StatusMessage {
            kind: StatusKind::Error,
            message: format!("Error: {}", failure.message),
        }
    } else if things.is_empty() {
        StatusMessage {
            kind: StatusKind::Warning,
            message: "No things found".to_string(),
        }
    } else {
        StatusMessage {
            kind: StatusKind::Success,
            message: format!("Loaded {} things", things.len()),
        }
    };

    ThingsResponse {
        bounds: fit_bounds(&coordinates, FIT_PADDING),
        center: [state.config.map_center_lat, state.config.map_center_lon],
        loaded_at: registry.loaded_at().await,
        refresh_failure,
        things,
        status,
    }
}

/// List placed things
#[utoipa::path(
    get,
    path = "/api/things",
    params(ThingsQuery),
    responses(
        (status = 200, description = "Things retrieved successfully", body = ThingsResponse),
    ),
    tag = "things"
)]
pub async fn list_things(
    State(state): State<AppState>,
    Query(query): Query<ThingsQuery>,
) -> Json<ThingsResponse> {
    Json(things_response(&state, query.q.as_deref()).await)
}

/// Reload things from the SensorThings server
///
/// Equivalent to a full page reload: cached series are dropped and the calling
/// session's cluster colors start over.
#[utoipa::path(
    post,
    path = "/api/things/reload",
    params(
        ("x-session-id" = Option<String>, Header, description = "Dashboard session id"),
    ),
    responses(
        (status = 200, description = "Registry reloaded", body = ThingsResponse),
        (status = 502, description = "SensorThings server unavailable"),
    ),
    tag = "things"
)]
pub async fn reload_things(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ThingsResponse>> {
    let session = session_id(&headers)?;
    worker::refresh_things(&state, RefreshKind::Full).await?;
    if let Some(id) = session {
        state.sessions.get(&id).await.cluster_colors.reset().await;
    }
    Ok(Json(things_response(&state, None).await))
}

/// Find things by exact name on the SensorThings server
#[utoipa::path(
    get,
    path = "/api/things/by-name/{name}",
    params(
        ("name" = String, Path, description = "Exact thing name"),
    ),
    responses(
        (status = 200, description = "Matching things", body = Vec<ThingSummary>),
        (status = 404, description = "No thing with that name"),
    ),
    tag = "things"
)]
pub async fn find_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Vec<ThingSummary>>> {
    let things = dashboard::find_things(&state.frost_client, &name).await?;
    if things.is_empty() {
        return Err(AppError::NotFound(format!("Thing '{name}' not found")));
    }
    Ok(Json(things))
}

/// List datastreams of a thing with their latest readings
#[utoipa::path(
    get,
    path = "/api/things/{thing_id}/datastreams",
    params(
        ("thing_id" = String, Path, description = "Thing @iot.id"),
    ),
    responses(
        (status = 200, description = "Datastreams retrieved successfully", body = Vec<DatastreamSummary>),
        (status = 502, description = "SensorThings server unavailable"),
    ),
    tag = "things"
)]
pub async fn thing_datastreams(
    State(state): State<AppState>,
    Path(thing_id): Path<String>,
) -> AppResult<Json<Vec<DatastreamSummary>>> {
    let id = IotId::parse(&thing_id);
    let datastreams = dashboard::load_datastreams(&state.frost_client, &id).await?;
    Ok(Json(datastreams))
}
