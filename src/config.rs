//! Per-city tuning parameters.
//!
//! Every threshold the pipeline consults lives here; nothing numeric
//! is hard-coded in the segmenter, classifier, matcher or aggregator.
//! Three cities ship built in (london, blacksburg, mumbai), each with
//! independently tuned values: tight tolerance for dense historic
//! grids, looser for suburban arterials.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, Result};
use crate::Bounds;

/// Tuning parameters for one city.
///
/// Construct a custom value for cities outside the built-in table, or
/// to override individual thresholds; the pipeline only ever reads
/// these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityParams {
    /// Match tolerance radius in meters: a trace point snaps to a
    /// street only within this distance.
    pub match_tolerance_m: f64,
    /// Walking speed ceiling in m/s; trips averaging above it are
    /// transit.
    pub max_walking_speed: f64,
    /// Minimum plausible walking speed in m/s; long slower trips are
    /// stationary noise.
    pub min_walking_speed: f64,
    /// Fraction of per-point speeds above the ceiling that flags a
    /// trip as transit even when the average stays under it.
    pub fast_fraction: f64,
    /// Straight-line displacement above which a trip cannot be a walk.
    pub max_direct_distance_m: f64,
    /// Adjacent-point time gap that splits a trace into separate trips.
    pub max_gap_seconds: i64,
    /// Adjacent-point distance gap that splits a trace into separate
    /// trips.
    pub max_gap_meters: f64,
    /// Trips with fewer points are discarded as noise.
    pub min_trip_points: usize,
    /// Trips shorter than this many seconds are discarded as noise.
    pub min_trip_duration_secs: i64,
    /// Trips shorter than this many meters are discarded as noise.
    pub min_trip_distance_m: f64,
    /// Matched ranges below this confidence never reach the
    /// aggregator.
    pub min_confidence: f64,
    /// Unmatched runs up to this many points are bridged when both
    /// sides agree on the segment.
    pub gap_bridge_points: usize,
    /// Bounding region for city inference when a trace carries no
    /// city id.
    pub bbox: Bounds,
}

impl Default for CityParams {
    fn default() -> Self {
        Self {
            match_tolerance_m: 8.0,
            max_walking_speed: 2.5,
            min_walking_speed: 0.2,
            fast_fraction: 0.3,
            max_direct_distance_m: 8_000.0,
            max_gap_seconds: 300,
            max_gap_meters: 200.0,
            min_trip_points: 5,
            min_trip_duration_secs: 60,
            min_trip_distance_m: 100.0,
            min_confidence: 0.25,
            gap_bridge_points: 3,
            bbox: Bounds {
                min_lat: -90.0,
                max_lat: 90.0,
                min_lng: -180.0,
                max_lng: 180.0,
            },
        }
    }
}

static CITY_PARAMS: Lazy<HashMap<&'static str, CityParams>> = Lazy::new(|| {
    let mut table = HashMap::new();

    table.insert(
        "london",
        CityParams {
            match_tolerance_m: 8.0,
            max_walking_speed: 2.5,
            min_walking_speed: 0.2,
            max_direct_distance_m: 8_000.0,
            bbox: Bounds {
                min_lat: 51.38,
                max_lat: 51.669,
                min_lng: -0.351,
                max_lng: 0.148,
            },
            ..CityParams::default()
        },
    );

    table.insert(
        "blacksburg",
        CityParams {
            match_tolerance_m: 10.0,
            max_walking_speed: 2.8,
            min_walking_speed: 0.2,
            max_direct_distance_m: 5_000.0,
            bbox: Bounds {
                min_lat: 37.18,
                max_lat: 37.25,
                min_lng: -80.5,
                max_lng: -80.38,
            },
            ..CityParams::default()
        },
    );

    table.insert(
        "mumbai",
        CityParams {
            match_tolerance_m: 6.0,
            max_walking_speed: 2.2,
            min_walking_speed: 0.1,
            max_direct_distance_m: 6_000.0,
            bbox: Bounds {
                min_lat: 18.89,
                max_lat: 19.28,
                min_lng: 72.77,
                max_lng: 72.99,
            },
            ..CityParams::default()
        },
    );

    table
});

impl CityParams {
    /// Look up the built-in parameters for a city.
    ///
    /// City names are matched case-insensitively. Returns
    /// [`CoverageError::UnknownCity`] for cities outside the table.
    pub fn for_city(city: &str) -> Result<&'static CityParams> {
        CITY_PARAMS
            .get(city.to_lowercase().as_str())
            .ok_or_else(|| CoverageError::UnknownCity {
                city: city.to_string(),
            })
    }

    /// Check whether a city has built-in parameters.
    pub fn is_known_city(city: &str) -> bool {
        CITY_PARAMS.contains_key(city.to_lowercase().as_str())
    }

    /// Infer which city a bounding box belongs to.
    ///
    /// Returns the first city whose configured region fully contains
    /// the given bounds; `None` if no city does. Iteration order is
    /// fixed by sorting names, so inference is deterministic.
    pub fn infer_city(bounds: &Bounds) -> Option<&'static str> {
        let mut names: Vec<&'static str> = CITY_PARAMS.keys().copied().collect();
        names.sort_unstable();
        names
            .into_iter()
            .find(|name| CITY_PARAMS[name].bbox.contains_bounds(bounds))
    }

    /// All built-in city names, sorted.
    pub fn cities() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = CITY_PARAMS.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
