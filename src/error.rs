//! Unified error handling for the street coverage engine.
//!
//! Errors here are fatal for the trace (or run) that raised them.
//! Data-quality outcomes (unmatched point runs, low-confidence
//! matches, discarded noise trips) are not errors and never surface
//! through this type.

use std::fmt;

/// Unified error type for street coverage operations.
#[derive(Debug, Clone)]
pub enum CoverageError {
    /// A city with no parameter table / street index was referenced
    UnknownCity { city: String },
    /// A trace carried a city id that doesn't match the engine's index
    CityMismatch {
        trace_id: String,
        expected: String,
        found: String,
    },
    /// A trace carried no city id and its bounds fall in no known city
    UnresolvedCity { trace_id: String },
    /// Non-monotonic timestamps or degenerate geometry
    MalformedTrace { trace_id: String, message: String },
    /// A street index was built with no segments
    EmptyStreetNetwork { city: String },
    /// Generic internal error (programming error, not a data condition)
    Internal { message: String },
}

impl fmt::Display for CoverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageError::UnknownCity { city } => {
                write!(f, "City '{}' has no configuration or street index", city)
            }
            CoverageError::CityMismatch {
                trace_id,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Trace '{}' belongs to city '{}', engine serves '{}'",
                    trace_id, found, expected
                )
            }
            CoverageError::UnresolvedCity { trace_id } => {
                write!(
                    f,
                    "Trace '{}' carries no city id and its bounds match no known city",
                    trace_id
                )
            }
            CoverageError::MalformedTrace { trace_id, message } => {
                write!(f, "Trace '{}' is malformed: {}", trace_id, message)
            }
            CoverageError::EmptyStreetNetwork { city } => {
                write!(f, "Street network for '{}' contains no segments", city)
            }
            CoverageError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for CoverageError {}

/// Result type alias for street coverage operations.
pub type Result<T> = std::result::Result<T, CoverageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoverageError::UnknownCity {
            city: "atlantis".to_string(),
        };
        assert!(err.to_string().contains("atlantis"));
    }

    #[test]
    fn test_malformed_trace_display() {
        let err = CoverageError::MalformedTrace {
            trace_id: "walk-7".to_string(),
            message: "timestamps decrease at index 12".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("walk-7"));
        assert!(text.contains("index 12"));
    }
}
