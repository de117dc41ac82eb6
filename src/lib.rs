//! # Streetcover
//!
//! Street coverage engine for walking GPS traces.
//!
//! Takes noisy, irregularly-sampled GPS activity traces and determines
//! which segments of a city's street network have been physically
//! walked, accumulating an idempotent coverage map across many
//! independently processed activities.
//!
//! The pipeline:
//! - Trip segmentation: split a trace on time/distance gaps
//! - Mode classification: keep walks, reject transit rides
//! - Map matching: snap walk points onto street segments
//! - Coverage aggregation: merge matches into durable coverage state
//!
//! ## Features
//!
//! - **`parallel`** - Parallel batch processing with rayon
//! - **`synthetic`** - Seeded synthetic trace generator for tests
//!
//! ## Quick Start
//!
//! ```rust
//! use streetcover::{CoverageEngine, GpsPoint, StreetIndex, StreetSegment, Trace, TracePoint};
//!
//! // One street running north through Bloomsbury
//! let polyline: Vec<GpsPoint> = (0..20)
//!     .map(|i| GpsPoint::new(51.5200 + i as f64 * 0.0004, -0.1300))
//!     .collect();
//! let street = StreetSegment::new("gower-001", "Gower Street", "london", polyline);
//! let index = StreetIndex::build("london", vec![street]).unwrap();
//!
//! // A ten-minute walk recorded along the same street
//! let points: Vec<TracePoint> = (0..20)
//!     .map(|i| TracePoint::new(i as i64 * 30, 51.5200 + i as f64 * 0.0004, -0.1300))
//!     .collect();
//! let trace = Trace::new("walk-1", Some("london"), points);
//!
//! let mut engine = CoverageEngine::new(index).unwrap();
//! engine.process_trace(&trace).unwrap();
//! assert!(engine.snapshot().is_covered("gower-001"));
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{CoverageError, Result};

// Geographic utilities (distance, bounds, polyline math)
pub mod geo_utils;

// Per-city tuning parameters
pub mod config;
pub use config::CityParams;

// Trip segmentation (gap splitting)
pub mod segmenter;
pub use segmenter::segment_trace;

// Walk/transit classification
pub mod classifier;
pub use classifier::{classify, speed_stats, SpeedStats};

// Street network with spatial index
pub mod street_index;
pub use street_index::StreetIndex;

// Map matching of walk trips onto street segments
pub mod matcher;
pub use matcher::match_trip;

// Coverage accumulation across trips
pub mod coverage;
pub use coverage::{CoverageAggregator, CoverageState, CoverageStats, SegmentCoverage};

// Pipeline engine tying the components together
pub mod engine;
pub use engine::{BatchSummary, CoverageEngine, EngineStats, TraceSummary};

// Synthetic trace generation for tests and benchmarks
#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use streetcover::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in meters (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
}

impl GpsPoint {
    /// Create a new GPS point without elevation.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }

    /// Create a new GPS point with elevation.
    pub fn with_elevation(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: Some(elevation),
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A timestamped GPS sample within a recorded activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    /// Unix timestamp in seconds
    pub time: i64,
    pub position: GpsPoint,
}

impl TracePoint {
    /// Create a new trace point without elevation.
    pub fn new(time: i64, latitude: f64, longitude: f64) -> Self {
        Self {
            time,
            position: GpsPoint::new(latitude, longitude),
        }
    }

    /// Create a new trace point with elevation.
    pub fn with_elevation(time: i64, latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            time,
            position: GpsPoint::with_elevation(latitude, longitude, elevation),
        }
    }
}

/// One recorded activity's full GPS point sequence.
///
/// Invariant: timestamps are non-decreasing ([`Trace::validate`]
/// enforces this before any processing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Unique identifier for the activity
    pub id: String,
    /// City the activity was recorded in, when the ingestion layer
    /// knows it; otherwise inferred from the trace bounds
    pub city: Option<String>,
    pub points: Vec<TracePoint>,
}

impl Trace {
    /// Create a new trace.
    pub fn new(id: &str, city: Option<&str>, points: Vec<TracePoint>) -> Self {
        Self {
            id: id.to_string(),
            city: city.map(|c| c.to_lowercase()),
            points,
        }
    }

    /// Validate the trace invariants.
    ///
    /// A trace must have at least two points, finite in-range
    /// coordinates, and non-decreasing timestamps. Violations are
    /// fatal for this trace only.
    pub fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(CoverageError::MalformedTrace {
                trace_id: self.id.clone(),
                message: format!("only {} point(s)", self.points.len()),
            });
        }

        for (i, p) in self.points.iter().enumerate() {
            if !p.position.is_valid() {
                return Err(CoverageError::MalformedTrace {
                    trace_id: self.id.clone(),
                    message: format!("invalid coordinates at index {}", i),
                });
            }
        }

        if let Some(i) =
            (1..self.points.len()).find(|&i| self.points[i].time < self.points[i - 1].time)
        {
            return Err(CoverageError::MalformedTrace {
                trace_id: self.id.clone(),
                message: format!("timestamps decrease at index {}", i),
            });
        }

        Ok(())
    }

    /// Bounding box of the trace, or `None` when empty.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_iter(self.points.iter().map(|p| p.position))
    }
}

/// Travel mode of a segmented trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripMode {
    Walk,
    Transit,
    /// Too few points or no elapsed time to classify reliably;
    /// excluded from matching
    Unknown,
}

/// A contiguous sub-sequence of a trace with derived metrics.
///
/// Created by the segmenter, classified, matched, then discarded;
/// trips are never persisted. The id is derived from the trace id and
/// point range, so identical input always produces identical trip
/// identities (the aggregator's idempotence key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    /// Stable identity: `"<trace_id>#<start>-<end>"`
    pub id: String,
    pub trace_id: String,
    /// Index of the first point within the source trace
    pub start_index: usize,
    /// Index of the last point within the source trace (inclusive)
    pub end_index: usize,
    pub points: Vec<TracePoint>,
    pub mode: TripMode,
    /// Path distance in meters
    pub distance_m: f64,
    /// Elapsed time in seconds
    pub duration_secs: i64,
    /// Average speed in m/s (path distance over elapsed time)
    pub avg_speed: f64,
}

impl Trip {
    /// Timestamp of the first point.
    pub fn start_time(&self) -> i64 {
        self.points.first().map(|p| p.time).unwrap_or(0)
    }

    /// Timestamp of the last point.
    pub fn end_time(&self) -> i64 {
        self.points.last().map(|p| p.time).unwrap_or(0)
    }
}

/// An addressable, immutable piece of street geometry.
///
/// Owned exclusively by the [`StreetIndex`] for a city; never mutated
/// after index construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetSegment {
    /// Stable id, unique within the city
    pub id: String,
    /// Street name ("Unknown" where the map data has none)
    pub name: String,
    pub city: String,
    pub polyline: Vec<GpsPoint>,
}

impl StreetSegment {
    /// Create a new street segment.
    pub fn new(id: &str, name: &str, city: &str, polyline: Vec<GpsPoint>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            city: city.to_lowercase(),
            polyline,
        }
    }

    /// Length of the segment geometry in meters.
    pub fn length_m(&self) -> f64 {
        geo_utils::polyline_length(&self.polyline)
    }

    /// Bounding box of the segment geometry.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.polyline)
    }
}

/// One matched run of trip points on a single street segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMatch {
    pub segment_id: String,
    /// Index of the first matched point within the trip
    pub start_index: usize,
    /// Index of the last matched point within the trip (inclusive)
    pub end_index: usize,
    /// Timestamp of the first matched point
    pub first_point_time: i64,
    /// Match confidence in [0, 1]; 1.0 on the centerline, falling to
    /// 0.0 at the tolerance radius
    pub confidence: f64,
}

/// Ordered map-matching result for one walk trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripMatch {
    pub trip_id: String,
    pub city: String,
    /// Matched ranges in trip order
    pub matches: Vec<SegmentMatch>,
    /// Points that snapped to a segment (including bridged gaps)
    pub matched_points: usize,
    /// Points left as genuine gaps (off-road, tunnels, dropout)
    pub unmatched_points: usize,
}

impl TripMatch {
    /// Distinct segment ids touched by this trip.
    pub fn segment_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.matches.iter().map(|m| m.segment_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points, `None` when empty.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        Self::from_iter(points.iter().copied())
    }

    /// Create bounds from an iterator of GPS points, `None` when empty.
    pub fn from_iter(points: impl IntoIterator<Item = GpsPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min_lat: first.latitude,
            max_lat: first.latitude,
            min_lng: first.longitude,
            max_lng: first.longitude,
        };
        for p in iter {
            bounds.min_lat = bounds.min_lat.min(p.latitude);
            bounds.max_lat = bounds.max_lat.max(p.latitude);
            bounds.min_lng = bounds.min_lng.min(p.longitude);
            bounds.max_lng = bounds.max_lng.max(p.longitude);
        }
        Some(bounds)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Check whether a point falls inside the bounds.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }

    /// Check whether another bounds is fully inside these bounds.
    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lng >= self.min_lng
            && other.max_lng <= self.max_lng
    }

    /// Merge with another bounds, producing the union box.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            max_lat: self.max_lat.max(other.max_lat),
            min_lng: self.min_lng.min(other.min_lng),
            max_lng: self.max_lng.max(other.max_lng),
        }
    }
}
