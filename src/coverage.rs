//! Coverage accumulation across trips.
//!
//! The aggregator owns the cumulative per-segment coverage state and
//! mutates it only through [`CoverageAggregator::merge`]. Merging is
//! idempotent (keyed by trip identity), commutative and associative
//! (min/sum per field), and monotone: a covered segment never becomes
//! uncovered; there is no removal path at all.

use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::TripMatch;

/// Coverage facts for one street segment.
///
/// A segment's presence in the state is what makes it covered; the
/// uncovered state is absence. That makes the one-way
/// UNCOVERED → COVERED transition structural rather than a flag to
/// keep honest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCoverage {
    /// Earliest matched-point timestamp across all merges
    pub first_covered_at: i64,
    /// Number of matched ranges seen for this segment; a trip that
    /// leaves and re-enters a street walked it twice
    pub times_walked: u32,
}

/// Cumulative coverage state, the ground truth accumulated across
/// runs.
///
/// Serializable as-is: the excluded export layer persists and reloads
/// it between runs. The processed-trip record travels with the
/// segment map so merge idempotence survives a reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageState {
    pub segments: HashMap<String, SegmentCoverage>,
    pub processed_trips: HashSet<String>,
}

impl CoverageState {
    /// Check whether a segment has ever been walked.
    pub fn is_covered(&self, segment_id: &str) -> bool {
        self.segments.contains_key(segment_id)
    }

    /// Coverage facts for a segment, `None` while uncovered.
    pub fn get(&self, segment_id: &str) -> Option<&SegmentCoverage> {
        self.segments.get(segment_id)
    }

    /// Number of covered segments.
    pub fn covered_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of trips merged so far.
    pub fn trips_processed(&self) -> usize {
        self.processed_trips.len()
    }
}

/// Aggregator statistics for monitoring.
#[derive(Debug, Clone, Copy)]
pub struct CoverageStats {
    pub segments_covered: usize,
    pub trips_processed: usize,
    /// Sum of times_walked across all segments
    pub total_walks: u64,
}

/// Accumulates match results into durable coverage state.
#[derive(Debug, Default)]
pub struct CoverageAggregator {
    state: CoverageState,
}

impl CoverageAggregator {
    /// Create an aggregator with empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator resuming from previously accumulated
    /// state.
    pub fn with_state(state: CoverageState) -> Self {
        Self { state }
    }

    /// Merge one trip's match result into the coverage state.
    ///
    /// Returns `false` when the trip was already processed (the merge
    /// is a no-op then: applying the same result twice leaves the
    /// state identical). Trips with no surviving matches still count
    /// as processed.
    pub fn merge(&mut self, result: &TripMatch) -> bool {
        if !self.state.processed_trips.insert(result.trip_id.clone()) {
            debug!("Trip '{}' already merged, skipping", result.trip_id);
            return false;
        }

        for m in &result.matches {
            self.state
                .segments
                .entry(m.segment_id.clone())
                .and_modify(|c| {
                    c.first_covered_at = c.first_covered_at.min(m.first_point_time);
                    c.times_walked += 1;
                })
                .or_insert(SegmentCoverage {
                    first_covered_at: m.first_point_time,
                    times_walked: 1,
                });
        }

        true
    }

    /// Read-only view of the accumulated state.
    pub fn snapshot(&self) -> &CoverageState {
        &self.state
    }

    /// Consume the aggregator, yielding the state for persistence.
    pub fn into_state(self) -> CoverageState {
        self.state
    }

    /// Current aggregate statistics.
    pub fn stats(&self) -> CoverageStats {
        CoverageStats {
            segments_covered: self.state.segments.len(),
            trips_processed: self.state.processed_trips.len(),
            total_walks: self
                .state
                .segments
                .values()
                .map(|c| c.times_walked as u64)
                .sum(),
        }
    }
}
