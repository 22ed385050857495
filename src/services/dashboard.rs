//! Batch loaders that turn upstream entities into dashboard views.
//!
//! Every loader follows the same rule: a failure on one item (a thing's
//! location, a datastream's latest reading) is logged and that item is
//! degraded, while the rest of the batch still comes back.

use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::frost::FrostClient;
use crate::frost::models::{Datastream, IotId, Location, ObservationRecord, Thing};
use crate::pipeline::format::{gap_label, value_label};
use crate::pipeline::{
    AxisRange, GapConfig, SensorHealth, SeriesPoint, StatsDisplay, build_series, chart_range,
    compute_health, compute_stats, format_display_name, most_recent,
};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThingSummary {
    pub id: IotId,
    pub name: String,
    pub description: String,
    /// `[lat, lon]`
    #[schema(value_type = Vec<f64>)]
    pub coordinates: [f64; 2],
    pub location_description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LatestReading {
    pub value: Option<f64>,
    pub phenomenon_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatastreamSummary {
    pub id: IotId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub unit: String,
    /// `None` when the datastream has no readings or the lookup failed.
    pub latest: Option<LatestReading>,
    /// Set when fetching the latest reading failed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Ready,
    NoData,
}

/// Everything the chart needs for one datastream.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesView {
    pub datastream_id: IotId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub unit: String,
    pub limit: usize,
    pub gap_policy: String,
    pub status: DataStatus,
    pub message: String,
    pub points: Vec<SeriesPoint>,
    pub stats: StatsDisplay,
    pub axis: Option<AxisRange>,
    /// Newest reading time, used to detect stale cache entries.
    pub latest_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThingHealth {
    pub thing_id: IotId,
    pub name: String,
    #[serde(flatten)]
    pub health: SensorHealth,
    /// Datastreams whose latest reading could not be fetched. They do not
    /// influence `status`.
    pub datastreams_failed: usize,
}

/// Combine a thing with its first location. Things without coordinates are
/// not placeable on the map and yield `None`.
#[must_use]
pub fn thing_summary(thing: &Thing, locations: &[Location]) -> Option<ThingSummary> {
    let location = locations.first()?;
    let coordinates = location.lat_lon()?;
    Some(ThingSummary {
        id: thing.id.clone(),
        name: thing.name.clone(),
        description: thing.description.clone().unwrap_or_default(),
        coordinates,
        location_description: location.description.clone().unwrap_or_default(),
    })
}

/// Load every thing together with its location.
///
/// # Errors
///
/// Returns `AppError::Upstream` only if the thing listing itself fails.
pub async fn load_things(client: &FrostClient) -> AppResult<Vec<ThingSummary>> {
    let things = client.get_things().await?;
    if things.is_empty() {
        tracing::info!("No things found on SensorThings server");
        return Ok(Vec::new());
    }
    Ok(place_things(client, &things).await)
}

/// Look up things by exact name and attach their locations.
///
/// # Errors
///
/// Returns `AppError::Upstream` if the name query fails.
pub async fn find_things(client: &FrostClient, name: &str) -> AppResult<Vec<ThingSummary>> {
    let things = client.find_things_by_name(name).await?;
    Ok(place_things(client, &things).await)
}

async fn place_things(client: &FrostClient, things: &[Thing]) -> Vec<ThingSummary> {
    let results: Vec<_> = stream::iter(things.iter().map(|thing| client.get_locations(&thing.id))).boxed()
        .buffered(client.concurrency())
        .collect()
        .await;

    let mut summaries = Vec::with_capacity(things.len());
    for (thing, result) in things.iter().zip(results) {
        match result {
            Ok(locations) => match thing_summary(thing, &locations) {
                Some(summary) => summaries.push(summary),
                None => tracing::debug!(thing_id = %thing.id, "Thing has no location, skipped"),
            },
            Err(e) => {
                tracing::warn!(error = %e, thing_id = %thing.id, "Failed to load thing location");
            }
        }
    }

    tracing::info!(
        things = things.len(),
        placed = summaries.len(),
        "Things placed"
    );
    summaries
}

fn datastream_summary(
    ds: &Datastream,
    latest: AppResult<Option<ObservationRecord>>,
) -> DatastreamSummary {
    let (latest, error) = match latest {
        Ok(record) => (
            record.map(|r| LatestReading {
                value: r.numeric_result(),
                phenomenon_time: r.timestamp(),
            }),
            None,
        ),
        Err(e) => {
            tracing::warn!(error = %e, datastream_id = %ds.id, "Failed to load latest observation");
            (None, Some(e.to_string()))
        }
    };

    DatastreamSummary {
        id: ds.id.clone(),
        name: ds.name.clone(),
        display_name: format_display_name(&ds.name),
        description: ds.description.clone().unwrap_or_default(),
        unit: ds.unit_symbol().to_string(),
        latest,
        error,
    }
}

/// Datastreams of a thing with their latest readings, fetched as one bounded
/// batch so the listing is complete before it is returned.
///
/// # Errors
///
/// Returns `AppError::Upstream` if the datastream listing fails.
pub async fn load_datastreams(
    client: &FrostClient,
    thing_id: &IotId,
) -> AppResult<Vec<DatastreamSummary>> {
    let datastreams = client.get_datastreams(thing_id).await?;
    let latest = latest_observations(client, &datastreams).await;

    Ok(datastreams
        .iter()
        .zip(latest)
        .map(|(ds, result)| datastream_summary(ds, result))
        .collect())
}

/// Run the series pipeline over a batch of raw observations.
#[must_use]
pub fn series_view(
    datastream: &Datastream,
    records: &[ObservationRecord],
    limit: usize,
    gaps: &GapConfig,
) -> SeriesView {
    let observations: Vec<_> = records
        .iter()
        .filter_map(ObservationRecord::to_observation)
        .collect();

    let dropped = records.len() - observations.len();
    if dropped > 0 {
        tracing::warn!(
            datastream_id = %datastream.id,
            dropped,
            "Dropped observations with unreadable phenomenonTime"
        );
    }

    let unit = datastream.unit_symbol();
    let points = build_series(&observations, gaps);
    let stats = compute_stats(&points, unit);
    let axis = chart_range(&points, unit);
    let latest_time = observations.iter().map(|o| o.timestamp).max();

    let (status, message) = if points.is_empty() {
        (DataStatus::NoData, "No observations found".to_string())
    } else if stats.summary.is_none() {
        (DataStatus::NoData, "No valid data points".to_string())
    } else {
        (
            DataStatus::Ready,
            format!("Loaded {} observations", points.len()),
        )
    };

    SeriesView {
        datastream_id: datastream.id.clone(),
        name: if datastream.name.is_empty() {
            "Unknown".to_string()
        } else {
            datastream.name.clone()
        },
        display_name: format_display_name(&datastream.name),
        description: datastream.description.clone().unwrap_or_default(),
        unit: unit.to_string(),
        limit,
        gap_policy: gaps.policy.name().to_string(),
        status,
        message,
        stats: stats.display(),
        axis,
        points,
        latest_time,
    }
}

/// Fetch and process the newest `limit` observations of a datastream.
///
/// # Errors
///
/// Returns `AppError::Upstream` if the datastream or its observations cannot
/// be fetched.
pub async fn load_series(
    client: &FrostClient,
    datastream_id: &IotId,
    limit: usize,
    gaps: &GapConfig,
) -> AppResult<SeriesView> {
    let (datastream, records) = futures::try_join!(
        client.get_datastream(datastream_id),
        client.get_observations(datastream_id, limit),
    )?;
    Ok(series_view(&datastream, &records, limit, gaps))
}

/// Health of one thing from the latest reading of each of its datastreams.
///
/// A thing whose datastream listing fails is reported as having no data.
pub async fn thing_health(client: &FrostClient, thing: &ThingSummary, now: DateTime<Utc>) -> ThingHealth {
    let datastreams = match client.get_datastreams(&thing.id).await {
        Ok(datastreams) => datastreams,
        Err(e) => {
            tracing::warn!(error = %e, thing_id = %thing.id, "Failed to list datastreams for health");
            return ThingHealth {
                thing_id: thing.id.clone(),
                name: thing.name.clone(),
                health: SensorHealth::no_data(),
                datastreams_failed: 0,
            };
        }
    };

    let results = latest_observations(client, &datastreams).await;

    let mut failed = 0;
    let latest = results.into_iter().map(|result| match result {
        Ok(record) => record.and_then(|r| r.timestamp()),
        Err(e) => {
            failed += 1;
            tracing::debug!(error = %e, thing_id = %thing.id, "Datastream dropped from health");
            None
        }
    });
    let newest = most_recent(latest);

    ThingHealth {
        thing_id: thing.id.clone(),
        name: thing.name.clone(),
        health: compute_health(newest, now),
        datastreams_failed: failed,
    }
}

/// Health of every thing, evaluated against the same `now`, in registry
/// order.
pub async fn all_health(
    client: &FrostClient,
    things: &[ThingSummary],
    now: DateTime<Utc>,
) -> Vec<ThingHealth> {
    stream::iter(things.iter().map(|thing| thing_health(client, thing, now))).boxed()
        .buffered(client.concurrency())
        .collect()
        .await
}

/// Latest reading of each datastream, in input order.
async fn latest_observations(
    client: &FrostClient,
    datastreams: &[Datastream],
) -> Vec<AppResult<Option<ObservationRecord>>> {
    stream::iter(datastreams.iter().map(|ds| client.get_latest_observation(&ds.id))).boxed()
        .buffered(client.concurrency())
        .collect()
        .await
}

#[derive(Serialize)]
struct CsvRow<'a> {
    time: String,
    value: Option<f64>,
    is_gap: bool,
    gap_duration_ms: Option<i64>,
    label: &'a str,
}

/// CSV export of a series, one row per point.
///
/// # Errors
///
/// Returns `AppError::Internal` if serialization fails.
pub fn series_csv(view: &SeriesView) -> AppResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    for point in &view.points {
        let label = gap_label(point).unwrap_or_else(|| value_label(point, &view.unit));
        writer
            .serialize(CsvRow {
                time: point.x.to_rfc3339(),
                value: if point.is_gap { None } else { point.y },
                is_gap: point.is_gap,
                gap_duration_ms: point.gap_duration_ms,
                label: &label,
            })
            .map_err(|e| AppError::Internal(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::Internal(e.to_string()))
}
