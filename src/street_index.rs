//! Street network with spatial indexing.
//!
//! Holds one city's street segments immutably and answers
//! nearest-segment queries through an R-tree over segment envelopes.
//! The R-tree pre-filters by bounding box; exact point-to-polyline
//! distances decide the final ordering.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};

use crate::config::CityParams;
use crate::error::{CoverageError, Result};
use crate::geo_utils::{meters_to_degrees, point_to_polyline_distance};
use crate::{Bounds, GpsPoint, StreetSegment};

/// Segment envelope wrapper for R-tree indexing.
#[derive(Debug, Clone)]
struct SegmentEnvelope {
    segment_idx: usize,
    min_lat: f64,
    max_lat: f64,
    min_lng: f64,
    max_lng: f64,
}

impl RTreeObject for SegmentEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// A city's street network with a spatial index for nearest-segment
/// queries.
///
/// Built once per city from externally loaded map data; read-only
/// afterwards.
#[derive(Debug)]
pub struct StreetIndex {
    city: String,
    segments: Vec<StreetSegment>,
    by_id: HashMap<String, usize>,
    tree: RTree<SegmentEnvelope>,
}

impl StreetIndex {
    /// Build an index from a city's street segments.
    ///
    /// Fails with [`CoverageError::UnknownCity`] when the city has no
    /// parameter table, [`CoverageError::EmptyStreetNetwork`] when no
    /// segments are given, and [`CoverageError::Internal`] on
    /// duplicate or degenerate segment geometry (authoritative map
    /// data is expected to be clean).
    pub fn build(city: &str, segments: Vec<StreetSegment>) -> Result<Self> {
        CityParams::for_city(city)?;
        let city = city.to_lowercase();

        if segments.is_empty() {
            return Err(CoverageError::EmptyStreetNetwork { city });
        }

        let mut by_id = HashMap::with_capacity(segments.len());
        let mut envelopes = Vec::with_capacity(segments.len());

        for (idx, segment) in segments.iter().enumerate() {
            let bounds = match segment.bounds() {
                Some(b) => b,
                None => {
                    return Err(CoverageError::Internal {
                        message: format!("segment '{}' has empty geometry", segment.id),
                    })
                }
            };
            if by_id.insert(segment.id.clone(), idx).is_some() {
                return Err(CoverageError::Internal {
                    message: format!("duplicate segment id '{}'", segment.id),
                });
            }
            envelopes.push(SegmentEnvelope {
                segment_idx: idx,
                min_lat: bounds.min_lat,
                max_lat: bounds.max_lat,
                min_lng: bounds.min_lng,
                max_lng: bounds.max_lng,
            });
        }

        Ok(Self {
            city,
            segments,
            by_id,
            tree: RTree::bulk_load(envelopes),
        })
    }

    /// The city this index serves.
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Find street segments within `radius_m` meters of a point,
    /// nearest first.
    ///
    /// Distances are exact point-to-polyline distances; ties break on
    /// the lexicographically smallest segment id so results are fully
    /// deterministic. Empty when nothing is within the radius.
    pub fn nearest_segments(
        &self,
        point: &GpsPoint,
        radius_m: f64,
    ) -> Vec<(&StreetSegment, f64)> {
        let radius_deg = meters_to_degrees(radius_m, point.latitude);
        let search = AABB::from_corners(
            [point.longitude - radius_deg, point.latitude - radius_deg],
            [point.longitude + radius_deg, point.latitude + radius_deg],
        );

        let mut hits: Vec<(&StreetSegment, f64)> = self
            .tree
            .locate_in_envelope_intersecting(&search)
            .map(|e| {
                let segment = &self.segments[e.segment_idx];
                (
                    segment,
                    point_to_polyline_distance(point, &segment.polyline),
                )
            })
            .filter(|(_, dist)| *dist <= radius_m)
            .collect();

        hits.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        hits
    }

    /// Get a segment by id.
    pub fn get(&self, id: &str) -> Option<&StreetSegment> {
        self.by_id.get(id).map(|&idx| &self.segments[idx])
    }

    /// Iterate over all segments.
    pub fn segments(&self) -> impl Iterator<Item = &StreetSegment> {
        self.segments.iter()
    }

    /// Bounding box of the whole network.
    pub fn bounds(&self) -> Option<Bounds> {
        self.segments
            .iter()
            .filter_map(|s| s.bounds())
            .reduce(|a, b| a.union(&b))
    }

    /// Total length of the network in meters.
    pub fn total_length_m(&self) -> f64 {
        self.segments.iter().map(|s| s.length_m()).sum()
    }

    /// Number of segments in the index.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
