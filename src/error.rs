//! Error types for the drift risk engine.
//!
//! `ConfigurationError` and `InvalidInput` are fatal for an invocation and
//! never come with partial output. `IngestError` covers reading the
//! observation feed, before the engine is involved. `SoftBoundsWarning` is
//! not an error at all; it is returned alongside a successful analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Parameter set rejected at configuration time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A required parameter was absent from the supplied configuration.
    #[error("Missing required parameter: {0}")]
    MissingField(String),

    /// A parameter is outside its hard (valid) range or not finite.
    #[error("Parameter {field} = {value} is outside the valid range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Two related thresholds are in the wrong order.
    #[error("Parameter {lower} ({lower_value}) must be below {upper} ({upper_value})")]
    Ordering {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    /// Factor weights cannot be normalized.
    #[error("Invalid weights: {0}")]
    InvalidWeights(&'static str),

    /// The configuration file could not be read or parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Observation sequence rejected before any processing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    #[error("Observation sequence is empty")]
    EmptySequence,

    /// Timestamps went backwards at `index`.
    #[error("Observation {index} at {current} is earlier than the preceding observation at {previous}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

/// Any fatal outcome of an engine invocation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),
}

/// Observation file or payload could not be turned into observations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("JSON deserialization failed: {0}")]
    Parse(String),

    /// Record `index` carried a timestamp that is not RFC 3339.
    #[error("Record {index} has invalid timestamp '{value}': {reason}")]
    Timestamp {
        index: usize,
        value: String,
        reason: String,
    },
}

/// A parameter outside its recommended range. The engine proceeds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftBoundsWarning {
    pub field: &'static str,
    pub value: f64,
    pub recommended_min: f64,
    pub recommended_max: f64,
}

impl fmt::Display for SoftBoundsWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} is outside the recommended range [{}, {}]",
            self.field, self.value, self.recommended_min, self.recommended_max
        )
    }
}
