//! Geographic utilities for GPS trace analysis.
//!
//! All functions expect WGS84 coordinates (latitude/longitude in
//! degrees), the standard produced by GPS receivers. Distances are in
//! meters along the Earth's surface.
//!
//! The point-to-polyline distance here is the kernel behind
//! nearest-segment queries: candidates come from the R-tree envelope
//! pre-filter, the exact distance from [`point_to_polyline_distance`].

use geo::{Distance, Haversine, Point};

use crate::{Bounds, GpsPoint, TracePoint};

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Calculate the great-circle distance between two GPS points using
/// the Haversine formula.
///
/// # Example
///
/// ```rust
/// use streetcover::{geo_utils, GpsPoint};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a polyline in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point polylines return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Calculate the total length of a timestamped track in meters.
pub fn track_length(points: &[TracePoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0].position, &w[1].position))
        .sum()
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Conservative (larger) value suitable for bounding-box expansion:
/// a square of this many degrees always contains the metric radius.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = METERS_PER_DEGREE * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

/// Distance in meters from a point to the segment between `a` and `b`.
///
/// Projects into a local equirectangular frame centered on the query
/// point, then runs planar point-to-segment math. Accurate to well
/// under a meter at the tens-of-meters scales used for map matching.
pub fn point_to_segment_distance(p: &GpsPoint, a: &GpsPoint, b: &GpsPoint) -> f64 {
    let m_lat = METERS_PER_DEGREE;
    let m_lng = METERS_PER_DEGREE * p.latitude.to_radians().cos().max(0.1);

    // Segment endpoints in meters relative to the query point
    let ax = (a.longitude - p.longitude) * m_lng;
    let ay = (a.latitude - p.latitude) * m_lat;
    let bx = (b.longitude - p.longitude) * m_lng;
    let by = (b.latitude - p.latitude) * m_lat;

    let dx = bx - ax;
    let dy = by - ay;
    let len2 = dx * dx + dy * dy;

    if len2 == 0.0 {
        return (ax * ax + ay * ay).sqrt();
    }

    // Clamp the projection of the origin onto the segment
    let t = (-(ax * dx + ay * dy) / len2).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;

    (cx * cx + cy * cy).sqrt()
}

/// Distance in meters from a point to the nearest part of a polyline.
///
/// Returns `f64::INFINITY` for an empty polyline; a single-point
/// polyline degenerates to the point distance.
pub fn point_to_polyline_distance(p: &GpsPoint, polyline: &[GpsPoint]) -> f64 {
    match polyline.len() {
        0 => f64::INFINITY,
        1 => haversine_distance(p, &polyline[0]),
        _ => polyline
            .windows(2)
            .map(|w| point_to_segment_distance(p, &w[0], &w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Compute the bounding box of a polyline, or `None` when empty.
pub fn compute_bounds(points: &[GpsPoint]) -> Option<Bounds> {
    Bounds::from_points(points)
}
