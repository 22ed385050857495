use serde::Serialize;
use utoipa::ToSchema;

use crate::pipeline::format::{fixed2, format_axis_tick};
use crate::pipeline::series::SeriesPoint;

/// Placeholder shown for statistics when no valid reading exists.
pub const NOT_AVAILABLE: &str = "N/A";

/// Number of labelled ticks on the y axis.
const AXIS_TICKS: usize = 5;

/// Unrounded summary over the valid readings of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub current: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    /// `None` when the series has no valid reading.
    pub summary: Option<Summary>,
    pub unit: String,
    pub gap_count: usize,
    pub total_points: usize,
}

/// Statistics as shown to the user: two decimals or `"N/A"`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatsDisplay {
    pub current: String,
    pub min: String,
    pub max: String,
    pub avg: String,
    pub unit: String,
    pub gap_count: usize,
    pub total_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AxisTick {
    pub value: f64,
    pub label: String,
}

/// Padded y-axis bounds for a chart.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<AxisTick>,
}

fn valid_values(series: &[SeriesPoint]) -> impl Iterator<Item = f64> + '_ {
    series.iter().filter(|p| !p.is_gap).filter_map(|p| p.y)
}

/// Summarize a processed series.
///
/// `current` is the last valid reading in series order. `gap_count` counts
/// every gap point of the full sequence, so with the filler policy each
/// filler is one unit and with the marker policy each gap event is one.
#[must_use]
pub fn compute_stats(series: &[SeriesPoint], unit: &str) -> SeriesStats {
    let gap_count = series.iter().filter(|p| p.is_gap).count();

    let mut total_points = 0usize;
    let mut sum = 0.0;
    let mut summary: Option<Summary> = None;

    for value in valid_values(series) {
        total_points += 1;
        sum += value;
        summary = Some(match summary {
            None => Summary {
                current: value,
                min: value,
                max: value,
                avg: value,
            },
            Some(s) => Summary {
                current: value,
                min: s.min.min(value),
                max: s.max.max(value),
                avg: s.avg,
            },
        });
    }

    if let Some(s) = summary.as_mut() {
        s.avg = sum / total_points as f64;
    }

    SeriesStats {
        summary,
        unit: unit.to_string(),
        gap_count,
        total_points,
    }
}

fn display_value(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), fixed2)
}

impl SeriesStats {
    #[must_use]
    pub fn display(&self) -> StatsDisplay {
        let s = self.summary;
        StatsDisplay {
            current: display_value(s.map(|s| s.current)),
            min: display_value(s.map(|s| s.min)),
            max: display_value(s.map(|s| s.max)),
            avg: display_value(s.map(|s| s.avg)),
            unit: self.unit.clone(),
            gap_count: self.gap_count,
            total_points: self.total_points,
        }
    }
}

/// Y-axis bounds with padding so a flat series still gets a visible axis.
///
/// `padding = max(range * 0.1, max(|max| * 0.01, 1))`. Returns `None` when
/// there is nothing to plot.
#[must_use]
pub fn chart_range(series: &[SeriesPoint], unit: &str) -> Option<AxisRange> {
    let (min, max) = valid_values(series).fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;

    let range = max - min;
    let padding = (range * 0.1).max((max.abs() * 0.01).max(1.0));
    let lower = min - padding;
    let upper = max + padding;

    let step = (upper - lower) / (AXIS_TICKS - 1) as f64;
    let ticks = (0..AXIS_TICKS)
        .map(|i| {
            let value = lower + step * i as f64;
            AxisTick {
                value,
                label: format_axis_tick(value, unit),
            }
        })
        .collect();

    Some(AxisRange {
        min: lower,
        max: upper,
        ticks,
    })
}
