//! Tests for observation ordering and gap annotation.
//!
//! Run with: cargo test --test series_test

use chrono::{DateTime, Duration, TimeZone, Utc};
use st_dash::pipeline::series::{
    GapConfig, MAX_FILLER_POINTS, Observation, build_series, readings,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn at(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

fn obs(minutes: i64, value: Option<f64>) -> Observation {
    Observation::new(at(minutes), value)
}

#[test]
fn empty_input_yields_empty_series() {
    assert!(build_series(&[], &GapConfig::default()).is_empty());
    assert!(build_series(&[], &GapConfig::marker(900_000)).is_empty());
}

#[test]
fn twenty_minute_gap_gets_three_fillers() {
    // Newest first, as the server returns them
    let input = [obs(20, Some(2.0)), obs(0, Some(1.0))];
    let points = build_series(&input, &GapConfig::default());

    let xs: Vec<_> = points.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![at(0), at(5), at(10), at(15), at(20)]);

    let gaps: Vec<_> = points.iter().map(|p| p.is_gap).collect();
    assert_eq!(gaps, vec![false, true, true, true, false]);

    for filler in points.iter().filter(|p| p.is_gap) {
        assert_eq!(filler.y, Some(0.0));
        assert_eq!(filler.gap_duration_ms, None);
    }
    assert_eq!(points[0].y, Some(1.0));
    assert_eq!(points[4].y, Some(2.0));
}

#[test]
fn filler_never_lands_on_the_next_reading() {
    let input = [obs(0, Some(1.0)), obs(16, Some(2.0))];
    let points = build_series(&input, &GapConfig::default());
    assert_eq!(points.iter().filter(|p| p.is_gap).count(), 3);
    assert!(points.iter().filter(|p| p.is_gap).all(|p| p.x < at(16)));
}

#[test]
fn gap_exactly_at_threshold_is_not_a_gap() {
    let input = [obs(0, Some(1.0)), obs(15, Some(2.0))];
    let points = build_series(&input, &GapConfig::default());
    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| !p.is_gap));
}

#[test]
fn marker_policy_emits_one_marker_with_duration() {
    let input = [obs(40, Some(3.0)), obs(0, Some(1.0))];
    let points = build_series(&input, &GapConfig::marker(15 * 60 * 1000));

    assert_eq!(points.len(), 3);
    let marker = points[1];
    assert!(marker.is_gap);
    assert_eq!(marker.x, at(15));
    assert_eq!(marker.y, None);
    assert_eq!(marker.gap_duration_ms, Some(40 * 60 * 1000));
}

#[test]
fn non_positive_filler_interval_degrades_to_marker() {
    let input = [obs(0, Some(1.0)), obs(30, Some(2.0))];
    let points = build_series(&input, &GapConfig::filler(15 * 60 * 1000, 0));

    assert_eq!(points.len(), 3);
    assert_eq!(points[1].gap_duration_ms, Some(30 * 60 * 1000));
}

#[test]
fn ties_keep_input_order() {
    let input = [obs(5, Some(1.0)), obs(0, Some(9.0)), obs(5, Some(2.0))];
    let points = build_series(&input, &GapConfig::default());
    let ys: Vec<_> = points.iter().map(|p| p.y).collect();
    assert_eq!(ys, vec![Some(9.0), Some(1.0), Some(2.0)]);
}

#[test]
fn output_is_sorted_and_preserves_every_reading() {
    let input = [
        obs(90, Some(4.0)),
        obs(3, None),
        obs(0, Some(1.0)),
        obs(45, Some(3.0)),
        obs(10, Some(2.0)),
        obs(200, None),
    ];
    let points = build_series(&input, &GapConfig::default());

    assert!(points.windows(2).all(|w| w[0].x <= w[1].x));

    let real: Vec<_> = points.iter().filter(|p| !p.is_gap).collect();
    assert_eq!(real.len(), input.len());
    for o in &input {
        let matches = real
            .iter()
            .filter(|p| p.x == o.timestamp && p.y == o.value)
            .count();
        assert_eq!(matches, 1, "reading at {} must appear once", o.timestamp);
    }
}

#[test]
fn readings_strip_gap_points() {
    let input = [obs(0, Some(1.0)), obs(60, None)];
    let points = build_series(&input, &GapConfig::default());
    assert!(points.len() > 2);

    let extracted = readings(&points);
    assert_eq!(extracted, vec![obs(0, Some(1.0)), obs(60, None)]);
}

#[test]
fn series_point_serializes_camel_case() {
    let input = [obs(0, Some(1.0)), obs(40, Some(2.0))];
    let points = build_series(&input, &GapConfig::marker(15 * 60 * 1000));
    let json = serde_json::to_value(points).unwrap();

    assert_eq!(json[0]["isGap"], false);
    assert!(json[0].get("gapDurationMs").is_none());
    assert_eq!(json[1]["isGap"], true);
    assert_eq!(json[1]["gapDurationMs"], 2_400_000);
    assert!(json[1]["y"].is_null());
}

#[test]
fn huge_filler_interval_does_not_overflow() {
    let input = [obs(0, Some(1.0)), obs(20, Some(2.0))];
    let points = build_series(&input, &GapConfig::filler(900_000, i64::MAX / 2));

    assert_eq!(points.len(), 2);
    assert!(points.iter().all(|p| !p.is_gap));
}

#[test]
fn gap_too_large_for_fillers_gets_a_marker() {
    // One day at 1 ms steps would be 86.4 million fillers
    let input = [obs(0, Some(1.0)), obs(24 * 60, Some(2.0))];
    let points = build_series(&input, &GapConfig::filler(900_000, 1));

    assert_eq!(points.len(), 3);
    assert!(points[1].is_gap);
    assert_eq!(points[1].y, None);
    assert_eq!(points[1].gap_duration_ms, Some(86_400_000));
}

#[test]
fn filler_points_are_bounded_per_series() {
    // Each gap needs 60 000 one-second fillers; the second no longer fits
    let input = [
        obs(0, Some(1.0)),
        obs(1000, Some(2.0)),
        obs(2000, Some(3.0)),
    ];
    let points = build_series(&input, &GapConfig::filler(900_000, 1000));

    let fillers = points.iter().filter(|p| p.is_gap && p.y == Some(0.0)).count();
    assert_eq!(fillers, 59_999);
    assert!(fillers <= MAX_FILLER_POINTS);

    let marker = points[points.len() - 2];
    assert!(marker.is_gap);
    assert_eq!(marker.gap_duration_ms, Some(60_000_000));
    assert_eq!(points.len(), 60_003);
}
