//! Raw period detection.
//!
//! A timestep qualifies when its total score exceeds `risk_threshold`. Runs
//! are found with the usual run-length grouping: a new group id starts every
//! time the qualifying flag flips, so each maximal run of equal flags shares
//! one id. Qualifying runs shorter than `min_duration` samples are dropped.
//! No merging happens here; see `merge`.

use std::ops::RangeInclusive;

use crate::config::ParameterSet;
use crate::model::{Period, RiskScore};
use crate::normalize::NormalizedObservation;
use crate::wind::{circular_mean, stability_of};

/// A maximal run of equal qualifying flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub group: usize,
    pub qualifying: bool,
    pub start: usize,
    pub end: usize,
}

impl Run {
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Qualifying flag per timestep.
pub fn qualifying_flags(scores: &[RiskScore], risk_threshold: f64) -> Vec<bool> {
    scores.iter().map(|s| s.total > risk_threshold).collect()
}

/// Group id per timestep: the cumulative count of flag flips.
pub fn group_ids(flags: &[bool]) -> Vec<usize> {
    let mut group = 0;
    flags
        .iter()
        .enumerate()
        .map(|(i, flag)| {
            if i > 0 && *flag != flags[i - 1] {
                group += 1;
            }
            group
        })
        .collect()
}

/// Collapses group ids into runs, in order.
pub fn runs(flags: &[bool]) -> Vec<Run> {
    let ids = group_ids(flags);
    let mut out: Vec<Run> = Vec::new();
    for (i, (&group, &qualifying)) in ids.iter().zip(flags).enumerate() {
        match out.last_mut() {
            Some(run) if run.group == group => run.end = i,
            _ => out.push(Run { group, qualifying, start: i, end: i }),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Span aggregation
// ---------------------------------------------------------------------------

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::NEG_INFINITY, f64::max)
}

fn min_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(f64::INFINITY, f64::min)
}

/// Builds an unlabelled period from every observation in `span`. All
/// aggregates come strictly from the spanned observations and their scores.
pub fn aggregate_span(
    normalized: &[NormalizedObservation],
    scores: &[RiskScore],
    span: RangeInclusive<usize>,
    params: &ParameterSet,
) -> Period {
    let (start, end) = (*span.start(), *span.end());
    let obs = &normalized[span.clone()];
    let sc = &scores[span];
    let n = obs.len() as f64;

    let changes: Vec<f64> = sc.iter().filter_map(|s| s.direction_change).collect();

    Period {
        id: 0,
        start: normalized[start].timestamp,
        end: normalized[end].timestamp,
        start_index: start,
        end_index: end,
        duration: obs.len(),
        qualifying_samples: sc.iter().filter(|s| s.total > params.risk_threshold).count(),
        max_score: max_of(sc.iter().map(|s| s.total)),
        mean_score: sc.iter().map(|s| s.total).sum::<f64>() / n,
        max_wind: max_of(obs.iter().map(|o| o.wind_speed.value)),
        mean_wind: obs.iter().map(|o| o.wind_speed.value).sum::<f64>() / n,
        max_gust: max_of(obs.iter().map(|o| o.wind_gust.value)),
        min_temperature: min_of(obs.iter().map(|o| o.air_temperature.value)),
        mean_temperature: obs.iter().map(|o| o.air_temperature.value).sum::<f64>() / n,
        max_snow_change: max_of(obs.iter().map(|o| o.snow_delta.abs())),
        net_snow_change: obs.iter().map(|o| o.snow_delta).sum(),
        total_precipitation: obs.iter().map(|o| o.precipitation).sum(),
        direction_changes: changes.iter().filter(|d| **d > params.wind_direction_change).count(),
        dominant_direction: circular_mean(obs.iter().filter_map(|o| o.wind_direction)),
        direction_stability: stability_of(changes.iter().copied()),
        intensity: None,
        intensity_score: None,
        severity: None,
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Detects raw periods: qualifying runs of at least `min_duration` samples,
/// ordered by start time and numbered from 1.
///
/// `normalized` and `scores` must be the same length and in timestamp order.
pub fn detect_periods(
    normalized: &[NormalizedObservation],
    scores: &[RiskScore],
    params: &ParameterSet,
) -> Vec<Period> {
    let flags = qualifying_flags(scores, params.risk_threshold);

    runs(&flags)
        .into_iter()
        .filter(|run| run.qualifying && run.len() >= params.min_duration)
        .enumerate()
        .map(|(i, run)| Period {
            id: i + 1,
            ..aggregate_span(normalized, scores, run.start..=run.end, params)
        })
        .collect()
}
