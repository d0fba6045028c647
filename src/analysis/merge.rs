//! Gap-tolerant merging of raw periods.
//!
//! Raw periods are folded in start order. When the silent gap between the
//! accumulator's end and the next period's start is at most `max_gap`
//! hours, the two are replaced by one merged period spanning both, including
//! the bridging observations between them. Otherwise the accumulator is
//! emitted and the next period becomes the new accumulator.
//!
//! Aggregates are recombined by kind:
//! - extremes (max score, wind, gust, snow change; min temperature) take the
//!   max/min of the parts,
//! - means (score, wind, temperature) are duration-weighted,
//! - additive values (precipitation, net snow change, direction changes,
//!   qualifying samples) are summed,
//! - the dominant direction and its stability are recomputed from the union
//!   of the underlying observations, never from the parts' means.
//!
//! Because the bridge is absorbed too, a merged period's duration equals the
//! number of observations it spans and its extremes match a direct
//! recomputation over `[start, end]`.

use tracing::debug;

use crate::analysis::periods::aggregate_span;
use crate::config::ParameterSet;
use crate::model::{Period, RiskScore, hours_between};
use crate::normalize::NormalizedObservation;
use crate::wind::{circular_mean, stability_of};

fn weighted_mean(m1: f64, d1: usize, m2: f64, d2: usize) -> f64 {
    let total = (d1 + d2) as f64;
    if total == 0.0 {
        return 0.0;
    }
    (m1 * d1 as f64 + m2 * d2 as f64) / total
}

/// Combines two adjacent periods (`b` starts right after `a` ends) into a
/// new period. Neither input is modified.
pub fn combine(
    a: &Period,
    b: &Period,
    normalized: &[NormalizedObservation],
    scores: &[RiskScore],
) -> Period {
    let (first, last) = if a.start_index <= b.start_index { (a, b) } else { (b, a) };
    let start_index = first.start_index;
    let end_index = first.end_index.max(last.end_index);
    let span = start_index..=end_index;

    let changes: Vec<f64> = scores[span.clone()].iter().filter_map(|s| s.direction_change).collect();

    Period {
        id: 0,
        start: first.start,
        end: first.end.max(last.end),
        start_index,
        end_index,
        duration: end_index - start_index + 1,
        qualifying_samples: a.qualifying_samples + b.qualifying_samples,
        max_score: a.max_score.max(b.max_score),
        mean_score: weighted_mean(a.mean_score, a.duration, b.mean_score, b.duration),
        max_wind: a.max_wind.max(b.max_wind),
        mean_wind: weighted_mean(a.mean_wind, a.duration, b.mean_wind, b.duration),
        max_gust: a.max_gust.max(b.max_gust),
        min_temperature: a.min_temperature.min(b.min_temperature),
        mean_temperature: weighted_mean(a.mean_temperature, a.duration, b.mean_temperature, b.duration),
        max_snow_change: a.max_snow_change.max(b.max_snow_change),
        net_snow_change: a.net_snow_change + b.net_snow_change,
        total_precipitation: a.total_precipitation + b.total_precipitation,
        direction_changes: a.direction_changes + b.direction_changes,
        dominant_direction: circular_mean(normalized[span].iter().filter_map(|o| o.wind_direction)),
        direction_stability: stability_of(changes.iter().copied()),
        intensity: None,
        intensity_score: None,
        severity: None,
    }
}

/// Merges `next` into `current`, absorbing the observations between them.
pub fn merge_pair(
    current: &Period,
    next: &Period,
    normalized: &[NormalizedObservation],
    scores: &[RiskScore],
    params: &ParameterSet,
) -> Period {
    if next.start_index <= current.end_index + 1 {
        return combine(current, next, normalized, scores);
    }
    let bridge = aggregate_span(normalized, scores, current.end_index + 1..=next.start_index - 1, params);
    let with_bridge = combine(current, &bridge, normalized, scores);
    combine(&with_bridge, next, normalized, scores)
}

/// Folds ordered raw periods into merged periods with fresh ids from 1.
pub fn merge_periods(
    raw: &[Period],
    normalized: &[NormalizedObservation],
    scores: &[RiskScore],
    params: &ParameterSet,
) -> Vec<Period> {
    let mut merged: Vec<Period> = Vec::with_capacity(raw.len());
    let mut current: Option<Period> = None;

    for next in raw {
        current = Some(match current {
            None => next.clone(),
            Some(acc) => {
                let gap = hours_between(acc.end, next.start);
                if gap <= params.max_gap {
                    debug!(gap_hours = gap, from = %acc.end, to = %next.start, "merging periods");
                    merge_pair(&acc, next, normalized, scores, params)
                } else {
                    merged.push(acc);
                    next.clone()
                }
            }
        });
    }
    merged.extend(current);

    merged
        .into_iter()
        .enumerate()
        .map(|(i, p)| Period { id: i + 1, ..p })
        .collect()
}
