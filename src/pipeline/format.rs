//! Number and label formatting for chart axes and tooltips.

use crate::pipeline::series::SeriesPoint;

fn with_unit(number: String, unit: &str) -> String {
    if unit.is_empty() {
        number
    } else {
        format!("{number} {unit}")
    }
}

/// Round to two decimals, ties away from zero.
///
/// Only values that are an odd number of eighths sit exactly on a tie at two
/// decimals; everything else already formats correctly from its exact
/// binary value.
#[must_use]
pub fn round2(value: f64) -> f64 {
    let eighths = value * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        (value * 100.0).round() / 100.0
    } else {
        value
    }
}

/// Two-decimal text for display, using [`round2`].
#[must_use]
pub fn fixed2(value: f64) -> String {
    format!("{:.2}", round2(value))
}

/// Label for a y-axis tick.
///
/// Large magnitudes get a `k` suffix, tiny non-zero ones switch to
/// exponential notation, everything else shows two decimals.
#[must_use]
pub fn format_axis_tick(value: f64, unit: &str) -> String {
    let magnitude = value.abs();
    let number = if magnitude >= 1000.0 {
        format!("{}k", fixed2(value / 1000.0))
    } else if magnitude < 0.01 && magnitude > 0.0 {
        format!("{value:.2e}")
    } else {
        fixed2(value)
    };
    with_unit(number, unit)
}

/// Tooltip text for a gap point, `None` for real readings.
#[must_use]
pub fn gap_label(point: &SeriesPoint) -> Option<String> {
    if !point.is_gap {
        return None;
    }
    Some(match point.gap_duration_ms {
        Some(ms) => format!("Data Gap: {} minutes", ms.div_euclid(60_000)),
        None => "Data Gap".to_string(),
    })
}

/// Tooltip text for a real reading.
#[must_use]
pub fn value_label(point: &SeriesPoint, unit: &str) -> String {
    match point.y {
        Some(v) => with_unit(fixed2(v), unit),
        None => with_unit("N/A".to_string(), unit),
    }
}
