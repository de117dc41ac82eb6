//! Synthetic GPS trace generator for tests and benchmarks.
//!
//! Generates street grids and traces walked along them at known
//! speeds, providing ground truth for validating the pipeline.
//! Everything is seeded, so generated data is fully reproducible.
//!
//! Feature-gated behind `synthetic`, not included in production
//! builds.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::geo_utils::{haversine_distance, polyline_length};
use crate::{GpsPoint, StreetSegment, Trace, TracePoint};

/// Meters per degree of latitude (approximately constant).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Configuration for trace generation along a polyline.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Travel speed in m/s.
    pub speed_mps: f64,
    /// Seconds between consecutive samples.
    pub sample_interval_secs: i64,
    /// Unix timestamp of the first sample.
    pub start_time: i64,
    /// GPS noise standard deviation in meters (0.0 = exact).
    pub noise_sigma_m: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            speed_mps: 1.4,
            sample_interval_secs: 30,
            start_time: 1_700_000_000,
            noise_sigma_m: 0.0,
            seed: 42,
        }
    }
}

/// Offset a point by meters east and north.
pub fn offset_point(p: &GpsPoint, east_m: f64, north_m: f64) -> GpsPoint {
    let meters_per_deg_lng = METERS_PER_DEGREE * p.latitude.to_radians().cos();
    GpsPoint::new(
        p.latitude + north_m / METERS_PER_DEGREE,
        p.longitude + east_m / meters_per_deg_lng,
    )
}

/// A straight polyline heading east from the origin, one vertex every
/// `spacing_m` meters.
pub fn straight_polyline(origin: GpsPoint, length_m: f64, spacing_m: f64) -> Vec<GpsPoint> {
    let steps = (length_m / spacing_m).floor() as usize;
    (0..=steps)
        .map(|i| offset_point(&origin, i as f64 * spacing_m, 0.0))
        .collect()
}

/// Generate a rectangular street grid.
///
/// `rows` east-west streets and `cols` north-south streets spaced
/// `block_m` apart, each a single segment spanning the grid. Ids are
/// `h<row>` / `v<col>`.
pub fn grid_streets(
    city: &str,
    origin: GpsPoint,
    rows: usize,
    cols: usize,
    block_m: f64,
) -> Vec<StreetSegment> {
    let width_m = (cols.saturating_sub(1)) as f64 * block_m;
    let height_m = (rows.saturating_sub(1)) as f64 * block_m;
    let mut segments = Vec::with_capacity(rows + cols);

    for r in 0..rows {
        let start = offset_point(&origin, 0.0, r as f64 * block_m);
        let end = offset_point(&origin, width_m, r as f64 * block_m);
        segments.push(StreetSegment::new(
            &format!("h{:02}", r),
            &format!("East Street {}", r),
            city,
            vec![start, end],
        ));
    }
    for c in 0..cols {
        let start = offset_point(&origin, c as f64 * block_m, 0.0);
        let end = offset_point(&origin, c as f64 * block_m, height_m);
        segments.push(StreetSegment::new(
            &format!("v{:02}", c),
            &format!("North Avenue {}", c),
            city,
            vec![start, end],
        ));
    }

    segments
}

/// Generate a trace travelling a polyline start-to-end at constant
/// speed.
pub fn trace_along(
    id: &str,
    city: Option<&str>,
    polyline: &[GpsPoint],
    config: &TraceConfig,
) -> Trace {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let points = sample_leg(
        polyline,
        config.speed_mps,
        config.sample_interval_secs,
        config.start_time,
        config.noise_sigma_m,
        &mut rng,
    );
    Trace::new(id, city, points)
}

/// Generate a trace made of several legs at different speeds, with a
/// dwell pause between legs (a wait at a stop, a recording gap).
///
/// Legs are `(polyline, speed_mps)` pairs; time runs continuously
/// except for `dwell_secs` inserted between consecutive legs.
pub fn multi_leg_trace(
    id: &str,
    city: Option<&str>,
    legs: &[(&[GpsPoint], f64)],
    dwell_secs: i64,
    config: &TraceConfig,
) -> Trace {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut points: Vec<TracePoint> = Vec::new();
    let mut clock = config.start_time;

    for (i, (polyline, speed)) in legs.iter().enumerate() {
        if i > 0 {
            clock += dwell_secs;
        }
        let leg = sample_leg(
            polyline,
            *speed,
            config.sample_interval_secs,
            clock,
            config.noise_sigma_m,
            &mut rng,
        );
        if let Some(last) = leg.last() {
            clock = last.time + config.sample_interval_secs;
        }
        points.extend(leg);
    }

    Trace::new(id, city, points)
}

/// Sample positions along a polyline at constant speed.
fn sample_leg(
    polyline: &[GpsPoint],
    speed_mps: f64,
    interval_secs: i64,
    start_time: i64,
    noise_sigma_m: f64,
    rng: &mut StdRng,
) -> Vec<TracePoint> {
    let total = polyline_length(polyline);
    if polyline.is_empty() || speed_mps <= 0.0 || interval_secs <= 0 {
        return Vec::new();
    }

    let step_m = speed_mps * interval_secs as f64;
    let samples = (total / step_m).floor() as i64;

    (0..=samples)
        .map(|k| {
            let mut position = point_at_distance(polyline, k as f64 * step_m);
            if noise_sigma_m > 0.0 {
                position = offset_point(
                    &position,
                    gaussian(rng) * noise_sigma_m,
                    gaussian(rng) * noise_sigma_m,
                );
            }
            TracePoint {
                time: start_time + k * interval_secs,
                position,
            }
        })
        .collect()
}

/// Interpolate the point at a given distance along a polyline.
fn point_at_distance(polyline: &[GpsPoint], target_m: f64) -> GpsPoint {
    let mut remaining = target_m.max(0.0);
    for w in polyline.windows(2) {
        let seg_len = haversine_distance(&w[0], &w[1]);
        if remaining <= seg_len && seg_len > 0.0 {
            let ratio = remaining / seg_len;
            return GpsPoint::new(
                w[0].latitude + ratio * (w[1].latitude - w[0].latitude),
                w[0].longitude + ratio * (w[1].longitude - w[0].longitude),
            );
        }
        remaining -= seg_len;
    }
    polyline[polyline.len() - 1]
}

/// Standard normal sample via the Box-Muller transform.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
