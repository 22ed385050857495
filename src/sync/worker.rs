use crate::common::AppState;
use crate::error::AppResult;
use crate::services::{cache, dashboard};
use crate::session::RefreshKind;

/// Reload the thing registry from the SensorThings server.
///
/// A full reload also drops every cached series; an incremental refresh
/// keeps them. Cluster maxima belong to client sessions and are reset by
/// the caller.
///
/// # Errors
///
/// Returns `AppError::Upstream` if the thing listing fails. The registry
/// keeps its previous things and records the failure so clients see an
/// error instead of an empty map.
pub async fn refresh_things(state: &AppState, refresh: RefreshKind) -> AppResult<usize> {
    let things = match dashboard::load_things(&state.frost_client).await {
        Ok(things) => things,
        Err(e) => {
            state.registry.record_failure(e.to_string()).await;
            return Err(e);
        }
    };
    let count = things.len();

    state.registry.replace(things).await;

    if refresh == RefreshKind::Full {
        cache::invalidate_prefix(state, "series");
    }

    tracing::info!(things = count, refresh = ?refresh, "Thing registry refreshed");
    Ok(count)
}
