use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::AppState;
use crate::error::{AppError, AppResult};
use crate::routes::require_session_id;
use crate::session::{ClusterIcon, RefreshKind};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClustersQuery {
    /// Member counts of the clusters in this rendering pass (comma-separated)
    pub counts: String,
    /// `full` resets the session maximum before coloring; `incremental` keeps it
    #[serde(default)]
    pub refresh: RefreshKind,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse {
    pub running_max: usize,
    pub clusters: Vec<ClusterIcon>,
}

fn parse_counts(raw: &str) -> AppResult<Vec<usize>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|_| AppError::BadRequest(format!("Invalid cluster count '{s}'")))
        })
        .collect()
}

/// Cluster marker icons
///
/// Colors each cluster by member count against the session's running maximum.
#[utoipa::path(
    get,
    path = "/api/clusters",
    params(
        ("x-session-id" = String, Header, description = "Dashboard session id"),
        ClustersQuery
    ),
    responses(
        (status = 200, description = "Cluster icons", body = ClustersResponse),
        (status = 400, description = "Invalid counts or missing session id"),
    ),
    tag = "clusters"
)]
pub async fn get_clusters(
    State(state): State<AppState>,
    Query(query): Query<ClustersQuery>,
    headers: HeaderMap,
) -> AppResult<Json<ClustersResponse>> {
    let session_id = require_session_id(&headers)?;
    let counts = parse_counts(&query.counts)?;

    let session = state.sessions.get(&session_id).await;
    let (clusters, running_max) = session
        .cluster_colors
        .render_pass(&counts, query.refresh)
        .await;

    Ok(Json(ClustersResponse {
        running_max,
        clusters,
    }))
}
