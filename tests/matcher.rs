//! Integration tests for map matching.

use streetcover::geo_utils::track_length;
use streetcover::{
    match_trip, CityParams, GpsPoint, StreetIndex, StreetSegment, TracePoint, Trip, TripMode,
};

const M_PER_DEG_LAT: f64 = 111_320.0;
const BASE_LAT: f64 = 51.5;
const BASE_LNG: f64 = -0.13;

fn lat_off(meters: f64) -> f64 {
    BASE_LAT + meters / M_PER_DEG_LAT
}

fn lng_off(meters: f64) -> f64 {
    BASE_LNG + meters / (M_PER_DEG_LAT * BASE_LAT.to_radians().cos())
}

/// An east-west street at `north_m` meters above the base latitude.
fn street(id: &str, north_m: f64, east_from_m: f64, east_to_m: f64) -> StreetSegment {
    StreetSegment::new(
        id,
        "Test Street",
        "london",
        vec![
            GpsPoint::new(lat_off(north_m), lng_off(east_from_m)),
            GpsPoint::new(lat_off(north_m), lng_off(east_to_m)),
        ],
    )
}

fn index_of(segments: Vec<StreetSegment>) -> StreetIndex {
    StreetIndex::build("london", segments).unwrap()
}

/// Eastbound walk: one point every 30m / 30s at `north_m` offset.
/// `detour` moves the listed indices an extra 20m north (off-street).
fn walk_points(count: usize, north_m: f64, detour: &[usize]) -> Vec<TracePoint> {
    (0..count)
        .map(|i| {
            let north = if detour.contains(&i) {
                north_m + 20.0
            } else {
                north_m
            };
            TracePoint::new(
                i as i64 * 30,
                lat_off(north),
                lng_off(i as f64 * 30.0),
            )
        })
        .collect()
}

fn make_trip(points: Vec<TracePoint>) -> Trip {
    let distance_m = track_length(&points);
    let duration_secs = points[points.len() - 1].time - points[0].time;
    let avg_speed = if duration_secs > 0 {
        distance_m / duration_secs as f64
    } else {
        0.0
    };
    let end_index = points.len() - 1;
    Trip {
        id: format!("trace#0-{}", end_index),
        trace_id: "trace".to_string(),
        start_index: 0,
        end_index,
        points,
        mode: TripMode::Walk,
        distance_m,
        duration_secs,
        avg_speed,
    }
}

fn london() -> CityParams {
    CityParams::for_city("london").unwrap().clone()
}

#[test]
fn test_single_street_collapses_to_one_range() {
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    let trip = make_trip(walk_points(15, 0.0, &[]));

    let result = match_trip(&trip, &index, &london());

    assert_eq!(result.matches.len(), 1);
    let m = &result.matches[0];
    assert_eq!(m.segment_id, "st-a");
    assert_eq!(m.start_index, 0);
    assert_eq!(m.end_index, 14);
    assert_eq!(m.first_point_time, 0);
    assert!(m.confidence > 0.95, "confidence was {}", m.confidence);
    assert_eq!(result.matched_points, 15);
    assert_eq!(result.unmatched_points, 0);
}

#[test]
fn test_continuity_bias_beats_nearest() {
    // Parallel streets 6m apart; one noisy point drifts closer to
    // st-b but the walk should stay on st-a
    let index = index_of(vec![
        street("st-a", 0.0, 0.0, 600.0),
        street("st-b", 6.0, 0.0, 600.0),
    ]);
    let mut points = walk_points(15, 1.0, &[]);
    // Point 7 at 4m north: 4m from st-a, 2m from st-b
    points[7].position.latitude = lat_off(4.0);

    let result = match_trip(&make_trip(points), &index, &london());

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].segment_id, "st-a");
    assert_eq!(result.matches[0].end_index, 14);
}

#[test]
fn test_exact_tie_breaks_on_segment_id() {
    // Streets at exactly 0 and 2^-15 degrees; the walk runs exactly
    // between them, so distances are bit-for-bit equal and the
    // smaller id must win every point
    let gap_deg = f64::powi(2.0, -15);
    let make = |id: &str, lat: f64| {
        StreetSegment::new(
            id,
            "Tie Street",
            "london",
            vec![
                GpsPoint::new(lat, lng_off(0.0)),
                GpsPoint::new(lat, lng_off(600.0)),
            ],
        )
    };
    let index = index_of(vec![
        make("st-b", BASE_LAT),
        make("st-a", BASE_LAT + gap_deg),
    ]);

    let points: Vec<TracePoint> = (0..10)
        .map(|i| {
            TracePoint::new(
                i as i64 * 30,
                BASE_LAT + gap_deg / 2.0,
                lng_off(i as f64 * 30.0),
            )
        })
        .collect();
    let result = match_trip(&make_trip(points), &index, &london());

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].segment_id, "st-a");
}

#[test]
fn test_street_transition_splits_ranges() {
    // Two streets end to end; the walk crosses from one to the other
    let index = index_of(vec![
        street("st-a", 0.0, 0.0, 300.0),
        street("st-b", 0.0, 300.0, 600.0),
    ]);
    let trip = make_trip(walk_points(20, 0.0, &[]));

    let result = match_trip(&trip, &index, &london());

    assert_eq!(result.matches.len(), 2);
    assert_eq!(result.matches[0].segment_id, "st-a");
    assert_eq!(result.matches[1].segment_id, "st-b");
    assert_eq!(result.segment_ids(), vec!["st-a", "st-b"]);
    assert_eq!(
        result.matches[0].end_index + 1,
        result.matches[1].start_index
    );
    assert_eq!(result.matched_points, 20);
}

#[test]
fn test_short_gap_bridged() {
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    // Points 9 and 10 detour 20m off the street
    let trip = make_trip(walk_points(20, 0.0, &[9, 10]));

    let result = match_trip(&trip, &index, &london());

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].start_index, 0);
    assert_eq!(result.matches[0].end_index, 19);
    assert_eq!(result.matched_points, 20);
    assert_eq!(result.unmatched_points, 0);
}

#[test]
fn test_long_gap_stays_gap() {
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    // Five consecutive off-street points exceed the bridge tolerance
    let trip = make_trip(walk_points(20, 0.0, &[8, 9, 10, 11, 12]));

    let result = match_trip(&trip, &index, &london());

    assert_eq!(result.matches.len(), 2);
    assert_eq!(result.matches[0].end_index, 7);
    assert_eq!(result.matches[1].start_index, 13);
    assert_eq!(result.matched_points, 15);
    assert_eq!(result.unmatched_points, 5);
}

#[test]
fn test_leading_gap_not_bridged() {
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    let trip = make_trip(walk_points(20, 0.0, &[0, 1]));

    let result = match_trip(&trip, &index, &london());

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].start_index, 2);
    assert_eq!(result.unmatched_points, 2);
}

#[test]
fn test_confidence_scales_with_distance() {
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    // A steady 2m offset from the centerline: confidence ~0.75
    let trip = make_trip(walk_points(15, 2.0, &[]));

    let result = match_trip(&trip, &index, &london());

    assert_eq!(result.matches.len(), 1);
    let confidence = result.matches[0].confidence;
    assert!(
        confidence > 0.70 && confidence < 0.80,
        "confidence was {}",
        confidence
    );
}

#[test]
fn test_low_confidence_range_dropped() {
    let params = CityParams {
        min_confidence: 0.9,
        ..london()
    };
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    // 4m offset: confidence ~0.5, below the 0.9 floor
    let trip = make_trip(walk_points(15, 4.0, &[]));

    let result = match_trip(&trip, &index, &params);

    assert!(result.matches.is_empty());
    assert_eq!(result.matched_points, 0);
    assert_eq!(result.unmatched_points, 15);
}

#[test]
fn test_fully_off_network() {
    let index = index_of(vec![street("st-a", 0.0, 0.0, 600.0)]);
    let trip = make_trip(walk_points(15, 500.0, &[]));

    let result = match_trip(&trip, &index, &london());

    assert!(result.matches.is_empty());
    assert_eq!(result.unmatched_points, 15);
}
