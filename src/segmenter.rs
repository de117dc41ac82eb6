//! Trip segmentation.
//!
//! Splits a time-ordered trace into disjoint trips, breaking on large
//! time or distance gaps between adjacent points (device dropout,
//! activity-switch boundaries). Sub-sequences too small to mean
//! anything are discarded as noise.

use log::debug;

use crate::config::CityParams;
use crate::error::Result;
use crate::geo_utils::{haversine_distance, track_length};
use crate::{Trace, Trip, TripMode};

/// Split a trace into trips at configured time/distance gaps.
///
/// The output trips are non-overlapping, ordered, and deterministic:
/// identical input always yields identical trip boundaries. Trips with
/// fewer than `min_trip_points` points, or shorter than the configured
/// duration/distance floors, are dropped.
///
/// Fails with [`crate::CoverageError::MalformedTrace`] when the trace
/// violates its invariants (fewer than two points, invalid
/// coordinates, decreasing timestamps).
pub fn segment_trace(trace: &Trace, params: &CityParams) -> Result<Vec<Trip>> {
    trace.validate()?;

    let points = &trace.points;
    let mut trips = Vec::new();
    let mut start = 0;

    for i in 1..points.len() {
        let dt = points[i].time - points[i - 1].time;
        let dist = haversine_distance(&points[i - 1].position, &points[i].position);

        if dt > params.max_gap_seconds || dist > params.max_gap_meters {
            push_trip(trace, start, i - 1, params, &mut trips);
            start = i;
        }
    }
    push_trip(trace, start, points.len() - 1, params, &mut trips);

    debug!(
        "Trace '{}': {} points segmented into {} trip(s)",
        trace.id,
        points.len(),
        trips.len()
    );

    Ok(trips)
}

/// Build the trip for `[start, end]` and keep it unless it is noise.
fn push_trip(trace: &Trace, start: usize, end: usize, params: &CityParams, trips: &mut Vec<Trip>) {
    let points = &trace.points[start..=end];

    if points.len() < params.min_trip_points {
        debug!(
            "Trace '{}': dropping {}-point fragment at [{}..={}]",
            trace.id,
            points.len(),
            start,
            end
        );
        return;
    }

    let distance_m = track_length(points);
    let duration_secs = points[points.len() - 1].time - points[0].time;

    if duration_secs < params.min_trip_duration_secs || distance_m < params.min_trip_distance_m {
        debug!(
            "Trace '{}': dropping short trip at [{}..={}] ({:.0}m, {}s)",
            trace.id, start, end, distance_m, duration_secs
        );
        return;
    }

    let avg_speed = if duration_secs > 0 {
        distance_m / duration_secs as f64
    } else {
        0.0
    };

    trips.push(Trip {
        id: format!("{}#{}-{}", trace.id, start, end),
        trace_id: trace.id.clone(),
        start_index: start,
        end_index: end,
        points: points.to_vec(),
        mode: TripMode::Unknown,
        distance_m,
        duration_secs,
        avg_speed,
    });
}
