//! Map matching of walk trips onto street segments.
//!
//! Snaps each trip point to a street within the city's match
//! tolerance, preferring the segment that continues the previous
//! point's match over the strictly nearest candidate: GPS noise flips
//! between parallel streets, a walker does not. Ties break by nearest
//! distance, then smallest segment id, so matching is bit-for-bit
//! deterministic.
//!
//! Consecutive points on the same segment collapse into one match
//! range. Short unmatched runs with the same segment on both sides are
//! bridged; long runs stay genuine gaps (off-road cuts, tunnels, GPS
//! dropout) and never claim coverage. Ranges below the configured
//! confidence floor are dropped before they reach the aggregator.

use log::debug;

use crate::config::CityParams;
use crate::street_index::StreetIndex;
use crate::{SegmentMatch, Trip, TripMatch};

/// Per-point matching outcome, before range collapsing.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PointChoice<'a> {
    /// Snapped to a segment at the given distance
    Matched { id: &'a str, dist: f64 },
    /// Gap point absorbed by the surrounding segment
    Bridged { id: &'a str },
    /// No segment within tolerance
    Unmatched,
}

/// Match a walk trip's points onto the street network.
///
/// Only meaningful for trips classified as [`crate::TripMode::Walk`];
/// the engine never calls it for anything else. Unmatched points and
/// dropped low-confidence ranges are data-quality outcomes, not
/// errors.
pub fn match_trip(trip: &Trip, index: &StreetIndex, params: &CityParams) -> TripMatch {
    let tolerance = params.match_tolerance_m;

    // Pass 1: snap each point, with continuity bias toward the
    // previously matched segment.
    let mut choices: Vec<PointChoice> = Vec::with_capacity(trip.points.len());
    let mut prev: Option<&str> = None;

    for point in &trip.points {
        let candidates = index.nearest_segments(&point.position, tolerance);
        if candidates.is_empty() {
            choices.push(PointChoice::Unmatched);
            continue;
        }

        // nearest_segments orders by (distance, id); candidates[0] is
        // the deterministic nearest.
        let (segment, dist) = prev
            .and_then(|prev_id| {
                candidates
                    .iter()
                    .find(|(candidate, _)| candidate.id == prev_id)
            })
            .copied()
            .unwrap_or(candidates[0]);

        choices.push(PointChoice::Matched {
            id: &segment.id,
            dist,
        });
        prev = Some(&segment.id);
    }

    bridge_short_gaps(&mut choices, params.gap_bridge_points);

    let matches = collapse_ranges(trip, &choices, tolerance, params.min_confidence);

    let matched_points: usize = matches.iter().map(|m| m.end_index - m.start_index + 1).sum();
    let unmatched_points = trip.points.len() - matched_points;

    debug!(
        "Trip '{}': {} range(s), {}/{} points matched",
        trip.id,
        matches.len(),
        matched_points,
        trip.points.len()
    );

    TripMatch {
        trip_id: trip.id.clone(),
        city: index.city().to_string(),
        matches,
        matched_points,
        unmatched_points,
    }
}

/// Per-point confidence: 1.0 on the centerline, 0.0 at the tolerance
/// radius.
fn point_confidence(dist: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        return 0.0;
    }
    (1.0 - dist / tolerance).clamp(0.0, 1.0)
}

/// Bridge unmatched runs no longer than `max_run` when the matched
/// segments on both sides agree.
fn bridge_short_gaps(choices: &mut [PointChoice], max_run: usize) {
    let mut i = 0;
    while i < choices.len() {
        if choices[i] != PointChoice::Unmatched {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < choices.len() && choices[i] == PointChoice::Unmatched {
            i += 1;
        }
        let run_len = i - run_start;

        // Leading/trailing runs have only one side and stay gaps.
        if run_start == 0 || i == choices.len() || run_len > max_run {
            continue;
        }

        let left = matched_id(&choices[run_start - 1]);
        let right = matched_id(&choices[i]);
        if let (Some(l), Some(r)) = (left, right) {
            if l == r {
                for choice in &mut choices[run_start..run_start + run_len] {
                    *choice = PointChoice::Bridged { id: l };
                }
            }
        }
    }
}

fn matched_id<'a>(choice: &PointChoice<'a>) -> Option<&'a str> {
    match choice {
        PointChoice::Matched { id, .. } => Some(id),
        PointChoice::Bridged { id } => Some(id),
        PointChoice::Unmatched => None,
    }
}

/// A range of consecutive points on one segment, being accumulated.
struct OpenRange<'a> {
    id: &'a str,
    start: usize,
    end: usize,
    conf_sum: f64,
    conf_samples: usize,
}

/// Collapse consecutive same-segment points into match ranges,
/// dropping ranges below the confidence floor.
fn collapse_ranges(
    trip: &Trip,
    choices: &[PointChoice],
    tolerance: f64,
    min_confidence: f64,
) -> Vec<SegmentMatch> {
    let mut matches = Vec::new();
    let mut open: Option<OpenRange> = None;

    for (i, choice) in choices.iter().enumerate() {
        match (matched_id(choice), &mut open) {
            (Some(id), Some(range)) if range.id == id => {
                range.end = i;
                if let PointChoice::Matched { dist, .. } = choice {
                    range.conf_sum += point_confidence(*dist, tolerance);
                    range.conf_samples += 1;
                }
            }
            (Some(id), _) => {
                if let Some(range) = open.take() {
                    flush_range(trip, range, min_confidence, &mut matches);
                }
                let (conf_sum, conf_samples) = match choice {
                    PointChoice::Matched { dist, .. } => (point_confidence(*dist, tolerance), 1),
                    _ => (0.0, 0),
                };
                open = Some(OpenRange {
                    id,
                    start: i,
                    end: i,
                    conf_sum,
                    conf_samples,
                });
            }
            (None, _) => {
                if let Some(range) = open.take() {
                    flush_range(trip, range, min_confidence, &mut matches);
                }
            }
        }
    }
    if let Some(range) = open.take() {
        flush_range(trip, range, min_confidence, &mut matches);
    }

    matches
}

/// Emit a completed range unless its confidence is below the floor.
fn flush_range(
    trip: &Trip,
    range: OpenRange<'_>,
    min_confidence: f64,
    matches: &mut Vec<SegmentMatch>,
) {
    // Bridged points contribute no confidence samples; a range always
    // begins with a real match, so samples >= 1.
    let confidence = range.conf_sum / range.conf_samples as f64;
    if confidence < min_confidence {
        debug!(
            "Trip '{}': dropping low-confidence range on '{}' ({:.2})",
            trip.id, range.id, confidence
        );
        return;
    }
    matches.push(SegmentMatch {
        segment_id: range.id.to_string(),
        start_index: range.start,
        end_index: range.end,
        first_point_time: trip.points[range.start].time,
        confidence,
    });
}
