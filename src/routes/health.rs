use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::frost::models::IotId;
use crate::services::dashboard::{self, ThingHealth};

/// Health check endpoint
///
/// Returns 200 OK if the service is running.
/// This endpoint does not touch the SensorThings server.
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "health"
)]
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Sensor health of one thing
///
/// Derived from the most recent observation across all of the thing's datastreams.
#[utoipa::path(
    get,
    path = "/api/things/{thing_id}/health",
    params(
        ("thing_id" = String, Path, description = "Thing @iot.id"),
    ),
    responses(
        (status = 200, description = "Health computed", body = ThingHealth),
        (status = 404, description = "Thing not registered"),
    ),
    tag = "health"
)]
pub async fn thing_health(
    State(state): State<AppState>,
    Path(thing_id): Path<String>,
) -> AppResult<Json<ThingHealth>> {
    let id = IotId::parse(&thing_id);
    let thing = state
        .registry
        .thing(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Thing '{thing_id}' not found")))?;

    Ok(Json(
        dashboard::thing_health(&state.frost_client, &thing, Utc::now()).await,
    ))
}

/// Sensor health of every registered thing
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Health computed", body = Vec<ThingHealth>),
    ),
    tag = "health"
)]
pub async fn all_health(State(state): State<AppState>) -> Json<Vec<ThingHealth>> {
    let things = state.registry.things().await;
    Json(dashboard::all_health(&state.frost_client, &things, Utc::now()).await)
}
