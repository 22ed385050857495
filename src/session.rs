//! Dashboard state: the shared thing registry and per-client sessions.
//!
//! The registry is one per server and is replaced by the refresh scheduler.
//! Everything the browser dashboard used to keep in globals for one map-load
//! (the cluster-color running maximum, the displayed series) lives in a
//! [`DashboardSession`] keyed by the client's session id. Reset rules are
//! explicit:
//!
//! | Event | Registry | Cluster maximum | Selection |
//! |-------|----------|-----------------|-----------|
//! | Full reload | replaced | reset to 1 for the caller | kept |
//! | Incremental refresh | replaced | kept | kept |
//! | Refresh failure | kept, failure recorded | kept | kept |

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use utoipa::ToSchema;

use crate::frost::models::IotId;
use crate::pipeline::cluster::{ClusterColor, SizeBucket, hex, map_cluster_color};
use crate::services::dashboard::{SeriesView, ThingSummary};

/// Fraction of the marker extent added on each side when fitting the map.
pub const FIT_PADDING: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RefreshKind {
    /// Page reload: everything derived from earlier renders is discarded.
    Full,
    /// Periodic refresh: session-wide aggregates survive.
    #[default]
    Incremental,
}

/// Running maximum of cluster member counts for one map-load session.
#[derive(Debug)]
pub struct ClusterColorState {
    max: Mutex<usize>,
}

impl Default for ClusterColorState {
    fn default() -> Self {
        Self { max: Mutex::new(1) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIcon {
    pub count: usize,
    pub color: String,
    #[schema(value_type = Vec<u8>)]
    pub rgb: [u8; 3],
    pub bucket: SizeBucket,
    pub icon_px: u32,
}

impl From<(usize, ClusterColor)> for ClusterIcon {
    fn from((count, color): (usize, ClusterColor)) -> Self {
        Self {
            count,
            color: hex(color.rgb),
            rgb: color.rgb,
            bucket: color.bucket,
            icon_px: color.bucket.icon_px(),
        }
    }
}

impl ClusterColorState {
    pub async fn running_max(&self) -> usize {
        *self.max.lock().await
    }

    pub async fn reset(&self) {
        *self.max.lock().await = 1;
    }

    /// Color every cluster of one rendering pass, in order, and return the
    /// icons with the maximum after the pass. The whole pass runs under one
    /// lock so concurrent passes never interleave.
    pub async fn render_pass(
        &self,
        counts: &[usize],
        refresh: RefreshKind,
    ) -> (Vec<ClusterIcon>, usize) {
        let mut max = self.max.lock().await;
        if refresh == RefreshKind::Full {
            *max = 1;
        }
        let icons = counts
            .iter()
            .map(|&count| {
                let color = map_cluster_color(count, *max);
                *max = color.new_running_max;
                ClusterIcon::from((count, color))
            })
            .collect();
        (icons, *max)
    }
}

/// Handed out by [`Selection::select`]; only the newest ticket may commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTicket {
    generation: u64,
    pub datastream_id: IotId,
}

/// The series currently on screen. Later selections win over earlier ones
/// regardless of which fetch finishes first.
#[derive(Debug, Default)]
pub struct Selection {
    generation: AtomicU64,
    displayed: RwLock<Option<Arc<SeriesView>>>,
}

impl Selection {
    pub fn select(&self, datastream_id: IotId) -> SelectionTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        SelectionTicket {
            generation,
            datastream_id,
        }
    }

    /// Store the result of `ticket`'s fetch. Returns `false` (and discards the
    /// view) if a newer selection has been made since.
    pub async fn commit(&self, ticket: &SelectionTicket, view: Arc<SeriesView>) -> bool {
        let mut displayed = self.displayed.write().await;
        if ticket.generation != self.generation.load(Ordering::SeqCst) {
            tracing::debug!(
                datastream_id = %ticket.datastream_id,
                "Discarding stale series result"
            );
            return false;
        }
        *displayed = Some(view);
        true
    }

    pub async fn displayed(&self) -> Option<Arc<SeriesView>> {
        self.displayed.read().await.clone()
    }
}

/// Padded map extent covering all things.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct MapBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

/// Bounds enclosing every `[lat, lon]`, widened by `padding` of the extent
/// on each side. `None` for an empty set.
#[must_use]
pub fn fit_bounds(coordinates: &[[f64; 2]], padding: f64) -> Option<MapBounds> {
    let (first, rest) = coordinates.split_first()?;
    let init = (first[0], first[1], first[0], first[1]);
    let (south, west, north, east) = rest.iter().fold(init, |(s, w, n, e), [lat, lon]| {
        (s.min(*lat), w.min(*lon), n.max(*lat), e.max(*lon))
    });

    let lat_pad = (north - south) * padding;
    let lon_pad = (east - west) * padding;
    Some(MapBounds {
        south: south - lat_pad,
        west: west - lon_pad,
        north: north + lat_pad,
        east: east + lon_pad,
    })
}

/// A registry refresh that did not complete.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFailure {
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Registry {
    things: Vec<ThingSummary>,
    loaded_at: Option<DateTime<Utc>>,
    last_failure: Option<RefreshFailure>,
}

/// Things placed on the map, shared by every client.
#[derive(Debug, Default)]
pub struct ThingRegistry {
    inner: RwLock<Registry>,
}

impl ThingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a freshly loaded set of things and clear any recorded failure.
    pub async fn replace(&self, things: Vec<ThingSummary>) {
        let mut registry = self.inner.write().await;
        tracing::debug!(
            previous = registry.things.len(),
            current = things.len(),
            "Thing registry replaced"
        );
        registry.things = things;
        registry.loaded_at = Some(Utc::now());
        registry.last_failure = None;
    }

    /// Remember a failed refresh. The previous things stay listed.
    pub async fn record_failure(&self, message: impl Into<String>) {
        let failure = RefreshFailure {
            message: message.into(),
            at: Utc::now(),
        };
        tracing::debug!(message = %failure.message, "Thing registry refresh failure recorded");
        self.inner.write().await.last_failure = Some(failure);
    }

    /// The failure of the most recent refresh, `None` once a refresh succeeds.
    pub async fn last_failure(&self) -> Option<RefreshFailure> {
        self.inner.read().await.last_failure.clone()
    }

    pub async fn things(&self) -> Vec<ThingSummary> {
        self.inner.read().await.things.clone()
    }

    /// Things whose name contains `query`, ignoring case. An empty query
    /// matches everything.
    pub async fn things_matching(&self, query: &str) -> Vec<ThingSummary> {
        let needle = query.trim().to_lowercase();
        self.inner
            .read()
            .await
            .things
            .iter()
            .filter(|t| needle.is_empty() || t.name.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub async fn thing(&self, id: &IotId) -> Option<ThingSummary> {
        self.inner
            .read()
            .await
            .things
            .iter()
            .find(|t| &t.id == id)
            .cloned()
    }

    pub async fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.loaded_at
    }
}

/// One client's map-load session.
#[derive(Debug, Default)]
pub struct DashboardSession {
    pub cluster_colors: ClusterColorState,
    pub selection: Selection,
}

impl DashboardSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Client sessions by session id, dropped after a period of inactivity.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, Arc<DashboardSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(max_sessions: u64, idle_seconds: u64) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(max_sessions)
                .time_to_idle(Duration::from_secs(idle_seconds))
                .build(),
        }
    }

    /// The session for `id`, created on first use.
    pub async fn get(&self, id: &str) -> Arc<DashboardSession> {
        self.sessions
            .get_with(id.to_string(), async {
                tracing::debug!(session_id = %id, "Dashboard session created");
                Arc::new(DashboardSession::new())
            })
            .await
    }

    /// The session for `id` if the client already has one.
    pub async fn existing(&self, id: &str) -> Option<Arc<DashboardSession>> {
        self.sessions.get(id).await
    }
}
