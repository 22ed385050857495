use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Readings younger than this many minutes mean the sensor is active.
pub const ACTIVE_MINUTES: f64 = 60.0;

/// Readings younger than this many minutes (and not active) mean warning.
pub const WARNING_MINUTES: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Active,
    Warning,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SensorHealth {
    pub status: HealthStatus,
    pub label: String,
    pub minutes_since_last_observation: Option<f64>,
}

impl SensorHealth {
    #[must_use]
    pub fn no_data() -> Self {
        Self {
            status: HealthStatus::Down,
            label: "No data".to_string(),
            minutes_since_last_observation: None,
        }
    }
}

/// Classify a sensor by the age of its most recent reading.
///
/// Thresholds are half-open: exactly 60 minutes is already `warning` and
/// exactly 120 minutes is `down`.
#[must_use]
pub fn compute_health(most_recent: Option<DateTime<Utc>>, now: DateTime<Utc>) -> SensorHealth {
    let Some(latest) = most_recent else {
        return SensorHealth::no_data();
    };

    let minutes = (now - latest).num_milliseconds() as f64 / 60_000.0;

    let (status, label) = if minutes < ACTIVE_MINUTES {
        (HealthStatus::Active, "<60mins")
    } else if minutes < WARNING_MINUTES {
        (HealthStatus::Warning, "<120mins")
    } else {
        (HealthStatus::Down, ">120mins")
    };

    SensorHealth {
        status,
        label: label.to_string(),
        minutes_since_last_observation: Some(minutes),
    }
}

/// Most recent timestamp across a sensor's datastreams.
///
/// Each item is the latest reading time of one datastream; datastreams that
/// failed or have no readings contribute `None` and are ignored.
#[must_use]
pub fn most_recent<I>(latest_per_datastream: I) -> Option<DateTime<Utc>>
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    latest_per_datastream.into_iter().flatten().max()
}
