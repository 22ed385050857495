pub mod clusters;
pub mod health;
pub mod series;
pub mod things;

use axum::{
    Router,
    http::HeaderMap,
    routing::{get, post},
};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::common::AppState;
use crate::error::{AppError, AppResult};

/// Header carrying the client's dashboard session id.
pub const SESSION_HEADER: &str = "x-session-id";

const SESSION_ID_MAX_LEN: usize = 128;

/// Session id sent by the client, if any.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the header is present but not a short
/// token of ASCII letters, digits, `-` or `_`.
pub fn session_id(headers: &HeaderMap) -> AppResult<Option<String>> {
    let Some(value) = headers.get(SESSION_HEADER) else {
        return Ok(None);
    };
    let id = value.to_str().map(str::trim).unwrap_or_default();
    let valid = !id.is_empty()
        && id.len() <= SESSION_ID_MAX_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(AppError::BadRequest(format!(
            "Invalid {SESSION_HEADER} header"
        )));
    }
    Ok(Some(id.to_string()))
}

/// Session id for endpoints that only make sense within a session.
///
/// # Errors
///
/// Returns `AppError::BadRequest` if the header is missing or invalid.
pub fn require_session_id(headers: &HeaderMap) -> AppResult<String> {
    session_id(headers)?
        .ok_or_else(|| AppError::BadRequest(format!("Missing {SESSION_HEADER} header")))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        health::thing_health,
        health::all_health,
        things::list_things,
        things::reload_things,
        things::find_by_name,
        things::thing_datastreams,
        series::get_series,
        series::get_selection,
        clusters::get_clusters,
    ),
    components(
        schemas(
            things::ThingsResponse,
            things::StatusMessage,
            crate::session::RefreshFailure,
            crate::services::dashboard::ThingSummary,
            crate::services::dashboard::DatastreamSummary,
            crate::services::dashboard::SeriesView,
            crate::services::dashboard::ThingHealth,
            clusters::ClustersResponse,
            crate::session::ClusterIcon,
        )
    ),
    tags(
        (name = "health", description = "Service liveness and sensor health"),
        (name = "things", description = "Sensor platforms and their datastreams"),
        (name = "series", description = "Chart-ready observation series"),
        (name = "clusters", description = "Map cluster icons"),
    ),
    info(
        title = "st-dash API",
        description = "Dashboard backend for SensorThings sensor telemetry",
        version = "0.1.0"
    )
)]
struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    tracing::info!(
        concurrency_limit = config.api_concurrency_limit,
        observation_limit = config.observation_limit,
        gap_policy = ?config.gap_policy,
        "API configured"
    );

    let api_routes = Router::new()
        .route("/things", get(things::list_things))
        .route("/things/reload", post(things::reload_things))
        .route("/things/by-name/{name}", get(things::find_by_name))
        .route("/things/{thing_id}/datastreams", get(things::thing_datastreams))
        .route("/things/{thing_id}/health", get(health::thing_health))
        .route("/health", get(health::all_health))
        .route("/datastreams/{datastream_id}/series", get(series::get_series))
        .route("/selection", get(series::get_selection))
        .route("/clusters", get(clusters::get_clusters))
        .layer(GlobalConcurrencyLimitLayer::new(config.api_concurrency_limit.max(1)))
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB body limit

    // Health check routes (no concurrency limit)
    let health_routes = Router::new().route("/healthz", get(health::healthz));

    // OpenAPI documentation
    let docs_routes = Router::new().merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Combine all routes
    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(docs_routes)
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
