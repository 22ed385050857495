//! Observation series building: ordering and gap annotation.
//!
//! Raw observations arrive newest-first and occasionally out of order from
//! the upstream server. The builder produces an ascending sequence of
//! [`SeriesPoint`]s where every interval longer than the gap threshold is
//! annotated with synthetic gap points, so the chart can show sensor
//! downtime instead of drawing a straight line across it.
//!
//! Two gap policies exist:
//!
//! | Policy | Gap points per interval | `y` | `gapDurationMs` |
//! |--------|-------------------------|-----|-----------------|
//! | [`GapPolicy::Filler`] | one every filler interval | `0` | absent |
//! | [`GapPolicy::Marker`] | exactly one, at `previous + threshold` | `null` | actual gap |

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Default gap threshold (15 minutes).
pub const DEFAULT_GAP_THRESHOLD_MS: i64 = 15 * 60 * 1000;

/// Default filler interval (5 minutes).
pub const DEFAULT_FILLER_INTERVAL_MS: i64 = 5 * 60 * 1000;

/// A single reading of one datastream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl Observation {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// A chartable point. Gap points are anchored at the gap time, never at a
/// real reading time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub x: DateTime<Utc>,
    pub y: Option<f64>,
    pub is_gap: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap_duration_ms: Option<i64>,
}

impl SeriesPoint {
    fn reading(obs: &Observation) -> Self {
        Self {
            x: obs.timestamp,
            y: obs.value,
            is_gap: false,
            gap_duration_ms: None,
        }
    }

    fn filler(x: DateTime<Utc>) -> Self {
        Self {
            x,
            y: Some(0.0),
            is_gap: true,
            gap_duration_ms: None,
        }
    }

    fn marker(x: DateTime<Utc>, gap: Duration) -> Self {
        Self {
            x,
            y: None,
            is_gap: true,
            gap_duration_ms: Some(gap.num_milliseconds()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapPolicy {
    /// Synthesize a filler point every `interval` inside the gap.
    Filler { interval: Duration },
    /// Emit one marker per gap carrying the gap duration.
    Marker,
}

impl GapPolicy {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filler { .. } => "filler",
            Self::Marker => "marker",
        }
    }
}

/// Gap detection settings for [`build_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapConfig {
    pub threshold: Duration,
    pub policy: GapPolicy,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            threshold: Duration::milliseconds(DEFAULT_GAP_THRESHOLD_MS),
            policy: GapPolicy::Filler {
                interval: Duration::milliseconds(DEFAULT_FILLER_INTERVAL_MS),
            },
        }
    }
}

impl GapConfig {
    #[must_use]
    pub fn filler(threshold_ms: i64, interval_ms: i64) -> Self {
        Self {
            threshold: Duration::milliseconds(threshold_ms),
            policy: GapPolicy::Filler {
                interval: Duration::milliseconds(interval_ms),
            },
        }
    }

    #[must_use]
    pub fn marker(threshold_ms: i64) -> Self {
        Self {
            threshold: Duration::milliseconds(threshold_ms),
            policy: GapPolicy::Marker,
        }
    }
}

/// Upper bound on filler points synthesized for one series. Gaps that would
/// exceed what is left of it get a single marker instead.
pub const MAX_FILLER_POINTS: usize = 100_000;

/// Sort observations and annotate gaps.
///
/// The sort is stable, so readings sharing a timestamp keep their input
/// order. Every non-gap point carries the original value, `None` included.
/// A filler policy with a non-positive interval falls back to a single
/// marker, since stepping by it would never reach the next reading, and so
/// does a gap whose fillers would exceed [`MAX_FILLER_POINTS`] for the series.
#[must_use]
pub fn build_series(observations: &[Observation], gaps: &GapConfig) -> Vec<SeriesPoint> {
    let mut sorted: Vec<&Observation> = observations.iter().collect();
    sorted.sort_by_key(|obs| obs.timestamp);

    let mut points = Vec::with_capacity(sorted.len());
    let mut previous_time: Option<DateTime<Utc>> = None;
    let mut filler_budget = MAX_FILLER_POINTS;

    for obs in sorted {
        if let Some(previous) = previous_time {
            let gap = obs.timestamp - previous;
            if gap > gaps.threshold {
                match gaps.policy {
                    GapPolicy::Filler { interval }
                        if interval > Duration::zero()
                            && fillers_needed(gap, interval) <= filler_budget =>
                    {
                        let mut next = previous.checked_add_signed(interval);
                        while let Some(filler_time) = next.filter(|t| *t < obs.timestamp) {
                            points.push(SeriesPoint::filler(filler_time));
                            filler_budget = filler_budget.saturating_sub(1);
                            next = filler_time.checked_add_signed(interval);
                        }
                    }
                    // previous + threshold < obs.timestamp, so this cannot overflow
                    _ => points.push(SeriesPoint::marker(previous + gaps.threshold, gap)),
                }
            }
        }

        points.push(SeriesPoint::reading(obs));
        previous_time = Some(obs.timestamp);
    }

    points
}

/// Upper estimate of the fillers strictly inside a gap.
fn fillers_needed(gap: Duration, interval: Duration) -> usize {
    let per_step = interval.num_milliseconds().max(1);
    usize::try_from(gap.num_milliseconds() / per_step).unwrap_or(usize::MAX)
}

/// Re-extract the real readings of a processed series.
#[must_use]
pub fn readings(points: &[SeriesPoint]) -> Vec<Observation> {
    points
        .iter()
        .filter(|p| !p.is_gap)
        .map(|p| Observation::new(p.x, p.y))
        .collect()
}
