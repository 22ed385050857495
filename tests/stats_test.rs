//! Tests for series statistics, axis range, and label formatting.
//!
//! Run with: cargo test --test stats_test

use chrono::{DateTime, Duration, TimeZone, Utc};
use st_dash::pipeline::format::{fixed2, format_axis_tick, gap_label, round2, value_label};
use st_dash::pipeline::series::{GapConfig, Observation, build_series, readings};
use st_dash::pipeline::stats::{NOT_AVAILABLE, chart_range, compute_stats};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn series(values: &[(i64, Option<f64>)]) -> Vec<st_dash::pipeline::SeriesPoint> {
    let input: Vec<_> = values
        .iter()
        .map(|(m, v)| Observation::new(at(*m), *v))
        .collect();
    build_series(&input, &GapConfig::default())
}

#[test]
fn ten_twenty_thirty() {
    let points = series(&[(0, Some(10.0)), (1, Some(20.0)), (2, Some(30.0))]);
    let stats = compute_stats(&points, "°C");
    let display = stats.display();

    assert_eq!(display.current, "30.00");
    assert_eq!(display.min, "10.00");
    assert_eq!(display.max, "30.00");
    assert_eq!(display.avg, "20.00");
    assert_eq!(display.unit, "°C");
    assert_eq!(display.gap_count, 0);
    assert_eq!(display.total_points, 3);
}

#[test]
fn raw_values_stay_unrounded() {
    let points = series(&[(0, Some(1.0)), (1, Some(1.0)), (2, Some(2.0))]);
    let summary = compute_stats(&points, "").summary.unwrap();
    assert!((summary.avg - 4.0 / 3.0).abs() < 1e-12);
    assert_eq!(compute_stats(&points, "").display().avg, "1.33");
}

#[test]
fn all_null_series_reports_not_available_and_counts_gaps() {
    let points = series(&[(0, None), (20, None)]);
    let stats = compute_stats(&points, "ppm");
    let display = stats.display();

    assert!(stats.summary.is_none());
    assert_eq!(display.current, NOT_AVAILABLE);
    assert_eq!(display.min, NOT_AVAILABLE);
    assert_eq!(display.max, NOT_AVAILABLE);
    assert_eq!(display.avg, NOT_AVAILABLE);
    assert_eq!(display.gap_count, 3);
    assert_eq!(display.total_points, 0);
}

#[test]
fn empty_series() {
    let display = compute_stats(&[], "").display();
    assert_eq!(display.current, "N/A");
    assert_eq!(display.gap_count, 0);
    assert_eq!(display.total_points, 0);
}

#[test]
fn current_is_last_in_series_order() {
    let points = series(&[(5, Some(1.0)), (0, Some(5.0))]);
    let summary = compute_stats(&points, "").summary.unwrap();
    assert_eq!(summary.current, 1.0);
    assert_eq!(summary.max, 5.0);
}

#[test]
fn filler_zeros_do_not_leak_into_statistics() {
    let points = series(&[(0, Some(10.0)), (20, Some(20.0))]);
    let stats = compute_stats(&points, "");
    let summary = stats.summary.unwrap();

    assert_eq!(summary.min, 10.0);
    assert_eq!(summary.avg, 15.0);
    assert_eq!(stats.gap_count, 3);
    assert_eq!(stats.total_points, 2);
}

#[test]
fn marker_policy_counts_gap_events() {
    let input = [
        Observation::new(at(0), Some(1.0)),
        Observation::new(at(60), Some(2.0)),
        Observation::new(at(120), Some(3.0)),
    ];
    let points = build_series(&input, &GapConfig::marker(15 * 60 * 1000));
    assert_eq!(compute_stats(&points, "").gap_count, 2);
}

#[test]
fn statistics_are_idempotent_over_reprocessing() {
    let points = series(&[(0, Some(3.5)), (40, Some(1.25)), (41, None), (90, Some(7.0))]);
    let first = compute_stats(&points, "hPa");

    let again = build_series(&readings(&points), &GapConfig::default());
    assert_eq!(compute_stats(&again, "hPa"), first);
}

#[test]
fn flat_series_gets_unit_padding() {
    let points = series(&[(0, Some(5.0)), (1, Some(5.0))]);
    let axis = chart_range(&points, "").unwrap();
    assert_eq!(axis.min, 4.0);
    assert_eq!(axis.max, 6.0);
}

#[test]
fn wide_series_gets_ten_percent_padding() {
    let points = series(&[(0, Some(0.0)), (1, Some(100.0))]);
    let axis = chart_range(&points, "°C").unwrap();
    assert_eq!(axis.min, -10.0);
    assert_eq!(axis.max, 110.0);

    let values: Vec<_> = axis.ticks.iter().map(|t| t.value).collect();
    assert_eq!(values, vec![-10.0, 20.0, 50.0, 80.0, 110.0]);
    assert_eq!(axis.ticks[0].label, "-10.00 °C");
}

#[test]
fn large_values_pad_by_one_percent_of_max() {
    let points = series(&[(0, Some(1000.0)), (1, Some(1000.0))]);
    let axis = chart_range(&points, "").unwrap();
    assert_eq!(axis.min, 990.0);
    assert_eq!(axis.max, 1010.0);
}

#[test]
fn no_axis_without_valid_points() {
    assert!(chart_range(&series(&[(0, None)]), "").is_none());
    assert!(chart_range(&[], "").is_none());
}

#[test]
fn axis_tick_labels() {
    assert_eq!(format_axis_tick(1500.0, "W"), "1.50k W");
    assert_eq!(format_axis_tick(-2500.0, ""), "-2.50k");
    assert_eq!(format_axis_tick(0.001, "ppm"), "1.00e-3 ppm");
    assert_eq!(format_axis_tick(12.5, "°C"), "12.50 °C");
    assert_eq!(format_axis_tick(0.0, "°C"), "0.00 °C");
}

#[test]
fn gap_and_value_labels() {
    let marker = build_series(
        &[Observation::new(at(0), Some(1.0)), Observation::new(at(40), Some(2.5))],
        &GapConfig::marker(15 * 60 * 1000),
    );
    assert_eq!(gap_label(&marker[1]).as_deref(), Some("Data Gap: 40 minutes"));
    assert_eq!(gap_label(&marker[0]), None);
    assert_eq!(value_label(&marker[2], "°C"), "2.50 °C");

    let filler = series(&[(0, Some(1.0)), (20, Some(2.0))]);
    assert_eq!(gap_label(&filler[1]).as_deref(), Some("Data Gap"));
}

#[test]
fn exact_ties_round_away_from_zero() {
    assert_eq!(fixed2(0.125), "0.13");
    assert_eq!(fixed2(0.375), "0.38");
    assert_eq!(fixed2(20.125), "20.13");
    assert_eq!(fixed2(-0.125), "-0.13");
    assert_eq!(round2(0.125), 0.13);

    // Not exact ties in binary, so they follow the stored value
    assert_eq!(fixed2(1.005), "1.00");
    assert_eq!(fixed2(2.675), "2.67");
    assert_eq!(fixed2(1.0 / 3.0), "0.33");
}

#[test]
fn eighth_degree_sensors_display_rounded_up() {
    let points = series(&[(0, Some(20.125)), (5, Some(20.375))]);
    let display = compute_stats(&points, "°C").display();

    assert_eq!(display.current, "20.38");
    assert_eq!(display.min, "20.13");
    assert_eq!(display.max, "20.38");
    assert_eq!(display.avg, "20.25");
    assert_eq!(value_label(&points[0], "°C"), "20.13 °C");
}
