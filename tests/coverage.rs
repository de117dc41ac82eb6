//! Integration tests for coverage aggregation.
//!
//! The aggregator's contract is algebraic: merge is idempotent,
//! commutative, associative, and monotone. These tests pin each
//! property down with hand-built match results.

use streetcover::{CoverageAggregator, CoverageState, SegmentMatch, TripMatch};

fn segment_match(segment_id: &str, first_point_time: i64) -> SegmentMatch {
    SegmentMatch {
        segment_id: segment_id.to_string(),
        start_index: 0,
        end_index: 9,
        first_point_time,
        confidence: 0.9,
    }
}

fn trip_match(trip_id: &str, segments: &[(&str, i64)]) -> TripMatch {
    TripMatch {
        trip_id: trip_id.to_string(),
        city: "london".to_string(),
        matches: segments
            .iter()
            .map(|(id, time)| segment_match(id, *time))
            .collect(),
        matched_points: 10,
        unmatched_points: 0,
    }
}

#[test]
fn test_first_merge_covers() {
    let mut agg = CoverageAggregator::new();
    let merged = agg.merge(&trip_match("t1", &[("seg-a", 1_000)]));

    assert!(merged);
    let state = agg.snapshot();
    assert!(state.is_covered("seg-a"));
    assert!(!state.is_covered("seg-b"));

    let coverage = state.get("seg-a").unwrap();
    assert_eq!(coverage.times_walked, 1);
    assert_eq!(coverage.first_covered_at, 1_000);
}

#[test]
fn test_idempotent_merge() {
    let result = trip_match("t1", &[("seg-a", 1_000), ("seg-b", 1_100)]);

    let mut agg = CoverageAggregator::new();
    assert!(agg.merge(&result));
    let after_once = agg.snapshot().clone();

    assert!(!agg.merge(&result));
    assert_eq!(agg.snapshot(), &after_once);
    assert_eq!(agg.snapshot().get("seg-a").unwrap().times_walked, 1);
}

#[test]
fn test_commutative_merge() {
    let r1 = trip_match("t1", &[("seg-a", 2_000), ("seg-b", 2_100)]);
    let r2 = trip_match("t2", &[("seg-b", 1_500), ("seg-c", 1_600)]);

    let mut forward = CoverageAggregator::new();
    forward.merge(&r1);
    forward.merge(&r2);

    let mut backward = CoverageAggregator::new();
    backward.merge(&r2);
    backward.merge(&r1);

    assert_eq!(forward.snapshot(), backward.snapshot());
}

#[test]
fn test_monotone_never_uncovers() {
    let mut agg = CoverageAggregator::new();
    agg.merge(&trip_match("t1", &[("seg-a", 1_000)]));

    // Merging unrelated and overlapping results never removes coverage
    agg.merge(&trip_match("t2", &[("seg-b", 2_000)]));
    agg.merge(&trip_match("t3", &[("seg-a", 3_000)]));

    assert!(agg.snapshot().is_covered("seg-a"));
    assert!(agg.snapshot().is_covered("seg-b"));
    assert_eq!(agg.snapshot().get("seg-a").unwrap().times_walked, 2);
}

#[test]
fn test_first_covered_at_is_earliest_across_merges() {
    let mut agg = CoverageAggregator::new();

    // Trips arrive out of chronological order
    agg.merge(&trip_match("t-late", &[("seg-a", 5_000)]));
    agg.merge(&trip_match("t-early", &[("seg-a", 1_200)]));

    assert_eq!(agg.snapshot().get("seg-a").unwrap().first_covered_at, 1_200);
    assert_eq!(agg.snapshot().get("seg-a").unwrap().times_walked, 2);
}

#[test]
fn test_revisit_within_one_trip_counts_twice() {
    // Out along the street and back again: two ranges, two walks
    let result = trip_match("t1", &[("seg-a", 1_000), ("seg-a", 1_900)]);

    let mut agg = CoverageAggregator::new();
    agg.merge(&result);

    let coverage = agg.snapshot().get("seg-a").unwrap();
    assert_eq!(coverage.times_walked, 2);
    assert_eq!(coverage.first_covered_at, 1_000);
}

#[test]
fn test_empty_result_still_recorded() {
    // A walk that matched nothing is still processed; re-merging it
    // stays a no-op
    let result = trip_match("t1", &[]);

    let mut agg = CoverageAggregator::new();
    assert!(agg.merge(&result));
    assert!(!agg.merge(&result));
    assert_eq!(agg.snapshot().covered_count(), 0);
    assert_eq!(agg.snapshot().trips_processed(), 1);
}

#[test]
fn test_stats() {
    let mut agg = CoverageAggregator::new();
    agg.merge(&trip_match("t1", &[("seg-a", 1_000), ("seg-b", 1_100)]));
    agg.merge(&trip_match("t2", &[("seg-a", 2_000)]));

    let stats = agg.stats();
    assert_eq!(stats.segments_covered, 2);
    assert_eq!(stats.trips_processed, 2);
    assert_eq!(stats.total_walks, 3);
}

#[test]
fn test_state_round_trips_through_serde() {
    let mut agg = CoverageAggregator::new();
    agg.merge(&trip_match("t1", &[("seg-a", 1_000)]));

    let json = serde_json::to_string(agg.snapshot()).unwrap();
    let restored: CoverageState = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, agg.snapshot());
}

#[test]
fn test_resume_from_state_keeps_idempotence() {
    let result = trip_match("t1", &[("seg-a", 1_000)]);

    let mut first_run = CoverageAggregator::new();
    first_run.merge(&result);
    let persisted = first_run.into_state();

    // Next run reloads the state and replays the same history
    let mut second_run = CoverageAggregator::with_state(persisted);
    assert!(!second_run.merge(&result));
    assert_eq!(second_run.snapshot().get("seg-a").unwrap().times_walked, 1);
}
