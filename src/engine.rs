//! # Coverage Engine
//!
//! Composes the pipeline components behind one façade:
//! segment → classify → match → merge, per trace.
//!
//! Every fallible step for a trace runs before its first merge, so a
//! failed trace leaves no partial coverage behind. Batch processing
//! skips and logs failed traces and keeps going; coverage already
//! merged from other traces is never rolled back.

use log::{info, warn};

use crate::classifier::classify;
use crate::config::CityParams;
use crate::coverage::{CoverageAggregator, CoverageState};
use crate::error::{CoverageError, Result};
use crate::matcher::match_trip;
use crate::segmenter::segment_trace;
use crate::street_index::StreetIndex;
use crate::{Trace, TripMatch, TripMode};

/// Street coverage engine for one city.
///
/// Holds the city's street index, its tuning parameters and the
/// accumulated coverage state. Traces are processed end-to-end and
/// independently of each other.
pub struct CoverageEngine {
    index: StreetIndex,
    params: CityParams,
    aggregator: CoverageAggregator,
}

/// Per-trace processing outcome before the merge phase.
struct TraceOutcome {
    trace_id: String,
    trips_total: usize,
    walk_trips: usize,
    transit_trips: usize,
    unknown_trips: usize,
    matches: Vec<TripMatch>,
}

/// Summary of one processed trace.
#[derive(Debug, Clone)]
pub struct TraceSummary {
    pub trace_id: String,
    pub trips_total: usize,
    pub walk_trips: usize,
    pub transit_trips: usize,
    pub unknown_trips: usize,
    pub matched_points: usize,
    pub unmatched_points: usize,
    /// Distinct segments touched by this trace's walk trips
    pub segments_touched: usize,
    /// Trips newly merged (idempotent re-merges excluded)
    pub trips_merged: usize,
}

/// Summary of a processed batch of traces.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub summaries: Vec<TraceSummary>,
    /// Traces skipped with the error that disqualified each
    pub skipped: Vec<(String, CoverageError)>,
}

impl BatchSummary {
    /// Number of traces processed successfully.
    pub fn traces_ok(&self) -> usize {
        self.summaries.len()
    }

    /// Number of traces skipped.
    pub fn traces_skipped(&self) -> usize {
        self.skipped.len()
    }
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub city: String,
    pub segments_total: usize,
    pub segments_covered: usize,
    pub trips_processed: usize,
}

impl CoverageEngine {
    /// Create an engine with the city's built-in parameters and empty
    /// coverage state.
    pub fn new(index: StreetIndex) -> Result<Self> {
        let params = CityParams::for_city(index.city())?.clone();
        Ok(Self {
            index,
            params,
            aggregator: CoverageAggregator::new(),
        })
    }

    /// Create an engine with custom parameters.
    pub fn with_params(index: StreetIndex, params: CityParams) -> Self {
        Self {
            index,
            params,
            aggregator: CoverageAggregator::new(),
        }
    }

    /// Create an engine resuming from previously accumulated coverage
    /// state.
    pub fn with_state(index: StreetIndex, state: CoverageState) -> Result<Self> {
        let params = CityParams::for_city(index.city())?.clone();
        Ok(Self {
            index,
            params,
            aggregator: CoverageAggregator::with_state(state),
        })
    }

    /// Process one trace end-to-end.
    ///
    /// Fails without touching coverage state when the trace is
    /// malformed or belongs to the wrong city; the failure is fatal
    /// for this trace only.
    pub fn process_trace(&mut self, trace: &Trace) -> Result<TraceSummary> {
        let outcome = Self::match_phase(trace, &self.index, &self.params)?;
        Ok(self.merge_phase(outcome))
    }

    /// Process a batch of traces, skipping and logging failures.
    pub fn process_traces(&mut self, traces: &[Trace]) -> BatchSummary {
        let mut batch = BatchSummary::default();
        for trace in traces {
            match self.process_trace(trace) {
                Ok(summary) => batch.summaries.push(summary),
                Err(err) => {
                    warn!("Skipping trace '{}': {}", trace.id, err);
                    batch.skipped.push((trace.id.clone(), err));
                }
            }
        }
        batch
    }

    /// Process a batch of traces with the match phase parallelized.
    ///
    /// The per-trace pipeline up to matching is pure, so it fans out
    /// across worker threads; merging stays sequential in input order
    /// (single writer). Because merge is commutative and idempotent,
    /// the final state is identical to sequential processing.
    #[cfg(feature = "parallel")]
    pub fn process_traces_parallel(&mut self, traces: &[Trace]) -> BatchSummary {
        use rayon::prelude::*;

        let outcomes: Vec<(String, Result<TraceOutcome>)> = traces
            .par_iter()
            .map(|trace| {
                (
                    trace.id.clone(),
                    Self::match_phase(trace, &self.index, &self.params),
                )
            })
            .collect();

        let mut batch = BatchSummary::default();
        for (trace_id, outcome) in outcomes {
            match outcome {
                Ok(outcome) => batch.summaries.push(self.merge_phase(outcome)),
                Err(err) => {
                    warn!("Skipping trace '{}': {}", trace_id, err);
                    batch.skipped.push((trace_id, err));
                }
            }
        }
        batch
    }

    /// Read-only view of the accumulated coverage state.
    pub fn snapshot(&self) -> &CoverageState {
        self.aggregator.snapshot()
    }

    /// Consume the engine, yielding the coverage state for
    /// persistence.
    pub fn into_state(self) -> CoverageState {
        self.aggregator.into_state()
    }

    /// The street index this engine serves.
    pub fn index(&self) -> &StreetIndex {
        &self.index
    }

    /// The parameters in effect.
    pub fn params(&self) -> &CityParams {
        &self.params
    }

    /// Engine statistics.
    pub fn stats(&self) -> EngineStats {
        let coverage = self.aggregator.stats();
        EngineStats {
            city: self.index.city().to_string(),
            segments_total: self.index.len(),
            segments_covered: coverage.segments_covered,
            trips_processed: coverage.trips_processed,
        }
    }

    // ========================================================================
    // Pipeline phases
    // ========================================================================

    /// Fallible, pure phase: city check, segmentation, classification,
    /// matching. Runs without touching shared state so failures leave
    /// nothing behind and batches can fan it out across threads.
    fn match_phase(
        trace: &Trace,
        index: &StreetIndex,
        params: &CityParams,
    ) -> Result<TraceOutcome> {
        Self::check_city(trace, index)?;

        let mut trips = segment_trace(trace, params)?;

        let mut walk_trips = 0;
        let mut transit_trips = 0;
        let mut unknown_trips = 0;
        let trips_total = trips.len();
        let mut matches = Vec::new();

        for trip in &mut trips {
            trip.mode = classify(trip, params);
            match trip.mode {
                TripMode::Walk => {
                    walk_trips += 1;
                    matches.push(match_trip(trip, index, params));
                }
                TripMode::Transit => transit_trips += 1,
                TripMode::Unknown => unknown_trips += 1,
            }
        }

        Ok(TraceOutcome {
            trace_id: trace.id.clone(),
            trips_total,
            walk_trips,
            transit_trips,
            unknown_trips,
            matches,
        })
    }

    /// Infallible phase: merge match results into coverage state.
    fn merge_phase(&mut self, outcome: TraceOutcome) -> TraceSummary {
        let matched_points: usize = outcome.matches.iter().map(|m| m.matched_points).sum();
        let unmatched_points: usize = outcome.matches.iter().map(|m| m.unmatched_points).sum();

        let mut touched: Vec<&str> = outcome
            .matches
            .iter()
            .flat_map(|m| m.matches.iter().map(|s| s.segment_id.as_str()))
            .collect();
        touched.sort_unstable();
        touched.dedup();
        let segments_touched = touched.len();

        let mut trips_merged = 0;
        for result in &outcome.matches {
            if self.aggregator.merge(result) {
                trips_merged += 1;
            }
        }

        info!(
            "Trace '{}': {} trip(s) ({} walk, {} transit, {} unknown), {} segment(s) touched",
            outcome.trace_id,
            outcome.trips_total,
            outcome.walk_trips,
            outcome.transit_trips,
            outcome.unknown_trips,
            segments_touched
        );

        TraceSummary {
            trace_id: outcome.trace_id,
            trips_total: outcome.trips_total,
            walk_trips: outcome.walk_trips,
            transit_trips: outcome.transit_trips,
            unknown_trips: outcome.unknown_trips,
            matched_points,
            unmatched_points,
            segments_touched,
            trips_merged,
        }
    }

    /// Check the trace belongs to this engine's city, inferring from
    /// the trace bounds when the ingestion layer attached no city id.
    fn check_city(trace: &Trace, index: &StreetIndex) -> Result<()> {
        if let Some(city) = &trace.city {
            if city != index.city() {
                return Err(CoverageError::CityMismatch {
                    trace_id: trace.id.clone(),
                    expected: index.city().to_string(),
                    found: city.clone(),
                });
            }
            // Matching the index's city implies the id is known: the
            // index could not have been built for an unknown city.
            return Ok(());
        }

        let bounds = trace.bounds().ok_or_else(|| CoverageError::MalformedTrace {
            trace_id: trace.id.clone(),
            message: "empty trace".to_string(),
        })?;

        match CityParams::infer_city(&bounds) {
            Some(city) if city == index.city() => Ok(()),
            Some(city) => Err(CoverageError::CityMismatch {
                trace_id: trace.id.clone(),
                expected: index.city().to_string(),
                found: city.to_string(),
            }),
            None => Err(CoverageError::UnresolvedCity {
                trace_id: trace.id.clone(),
            }),
        }
    }
}
