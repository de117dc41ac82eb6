//! Walk/transit classification.
//!
//! Labels each trip using speed statistics and path shape. Transit
//! trips must never contribute street coverage, so every rule here
//! errs toward excluding a trip rather than matching it.

use crate::config::CityParams;
use crate::geo_utils::haversine_distance;
use crate::{TracePoint, Trip, TripMode};

/// Direct displacement above which a near-straight path is assumed to
/// be a transit route (rail and bus corridors are straight; walks
/// wander).
const STRAIGHT_TRANSIT_DIRECT_M: f64 = 2_000.0;

/// Path-to-direct ratio below which a long path counts as
/// near-straight.
const STRAIGHT_TRANSIT_SINUOSITY: f64 = 1.05;

/// Direct displacement above which an implausibly slow trip is treated
/// as stationary noise rather than a walk.
const STATIONARY_CHECK_DIRECT_M: f64 = 500.0;

/// Speed statistics for a trip.
#[derive(Debug, Clone, Copy)]
pub struct SpeedStats {
    /// Average speed in m/s (path distance over elapsed time)
    pub avg: f64,
    /// 90th percentile of per-point instantaneous speeds
    pub p90: f64,
    /// Number of usable instantaneous speed samples
    pub samples: usize,
}

/// Compute per-point instantaneous speeds for a trip.
///
/// Pairs with no elapsed time are skipped (duplicate timestamps give
/// no usable speed).
pub fn point_speeds(points: &[TracePoint]) -> Vec<f64> {
    points
        .windows(2)
        .filter_map(|w| {
            let dt = w[1].time - w[0].time;
            if dt <= 0 {
                return None;
            }
            Some(haversine_distance(&w[0].position, &w[1].position) / dt as f64)
        })
        .collect()
}

/// Compute speed statistics for a trip, `None` when the trip has no
/// usable speed samples.
pub fn speed_stats(trip: &Trip) -> Option<SpeedStats> {
    let mut speeds = point_speeds(&trip.points);
    if speeds.is_empty() {
        return None;
    }

    speeds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let p90_idx = ((speeds.len() as f64) * 0.9).ceil() as usize - 1;
    let p90 = speeds[p90_idx.min(speeds.len() - 1)];

    Some(SpeedStats {
        avg: trip.avg_speed,
        p90,
        samples: speeds.len(),
    })
}

/// Classify a trip as walk, transit, or unknown.
///
/// Transit when the average speed exceeds the city's walking ceiling,
/// when too large a fraction of points exceed it (a transit ride
/// bracketed by short walks), when the displacement is too large to
/// walk, or when a long path is suspiciously straight. Unknown when
/// there is too little data to decide, or when a long path is slower
/// than any plausible walk (stationary GPS noise). Walk otherwise.
pub fn classify(trip: &Trip, params: &CityParams) -> TripMode {
    if trip.points.len() < params.min_trip_points || trip.duration_secs <= 0 {
        return TripMode::Unknown;
    }

    let speeds = point_speeds(&trip.points);
    if speeds.is_empty() {
        return TripMode::Unknown;
    }

    if trip.avg_speed > params.max_walking_speed {
        return TripMode::Transit;
    }

    let fast = speeds
        .iter()
        .filter(|s| **s > params.max_walking_speed)
        .count() as f64
        / speeds.len() as f64;
    if fast > params.fast_fraction {
        return TripMode::Transit;
    }

    let first = &trip.points[0].position;
    let last = &trip.points[trip.points.len() - 1].position;
    let direct = haversine_distance(first, last);

    if direct > params.max_direct_distance_m {
        return TripMode::Transit;
    }

    if direct > STRAIGHT_TRANSIT_DIRECT_M && trip.distance_m / direct < STRAIGHT_TRANSIT_SINUOSITY {
        return TripMode::Transit;
    }

    if direct > STATIONARY_CHECK_DIRECT_M && trip.avg_speed < params.min_walking_speed {
        return TripMode::Unknown;
    }

    TripMode::Walk
}
