//! End-to-end analysis of one observation sequence.
//!
//! Normalizer → Scorer → Detector → Merger → Classifier. Each stage only
//! reads the output of the one before it. Input problems are rejected up
//! front so that no stage ever sees an empty or unordered sequence, and a
//! rejected invocation never yields partial output.

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::merge::merge_periods;
use crate::analysis::periods::detect_periods;
use crate::analysis::scoring::score_sequence;
use crate::analysis::severity::classify_periods;
use crate::config::ParameterSet;
use crate::error::{EngineError, InvalidInput, SoftBoundsWarning};
use crate::model::{Period, RiskScore, WeatherObservation};
use crate::normalize::{NormalizationReport, normalize};

/// Everything one invocation produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// One score per input observation, in input order.
    pub scores: Vec<RiskScore>,
    /// Merged and classified periods, ordered by start, ids from 1.
    pub periods: Vec<Period>,
    /// Parameters outside their recommended ranges.
    pub warnings: Vec<SoftBoundsWarning>,
    pub normalization: NormalizationReport,
}

/// Rejects empty sequences and timestamps that go backwards. Equal
/// consecutive timestamps are accepted.
pub fn validate_sequence(observations: &[WeatherObservation]) -> Result<(), InvalidInput> {
    if observations.is_empty() {
        return Err(InvalidInput::EmptySequence);
    }
    for (index, pair) in observations.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(InvalidInput::OutOfOrder {
                index: index + 1,
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

/// Output of every stage before classification.
pub(crate) struct Stages {
    pub scores: Vec<RiskScore>,
    pub merged: Vec<Period>,
    pub report: NormalizationReport,
}

/// Normalizes, scores, detects and merges. Input must already be validated.
pub(crate) fn run_stages(observations: &[WeatherObservation], params: &ParameterSet) -> Stages {
    let (normalized, report) = normalize(observations, &params.normalization);
    let scores = score_sequence(&normalized, params);

    let raw = detect_periods(&normalized, &scores, params);
    let merged = merge_periods(&raw, &normalized, &scores, params);
    debug!(raw = raw.len(), merged = merged.len(), "period detection complete");

    Stages { scores, merged, report }
}

/// Runs the full engine over an ordered observation sequence.
pub fn analyze(observations: &[WeatherObservation], params: &ParameterSet) -> Result<Analysis, EngineError> {
    let warnings = params.validate()?;
    validate_sequence(observations)?;

    let Stages { scores, merged, report } = run_stages(observations, params);
    let periods = classify_periods(&merged);
    let degraded = scores.iter().filter(|s| s.degraded).count();

    info!(
        observations = observations.len(),
        periods = periods.len(),
        degraded,
        "analysis complete"
    );

    Ok(Analysis {
        scores,
        periods,
        warnings,
        normalization: report,
    })
}
