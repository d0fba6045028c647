//! Intensity and severity labels for merged periods.
//!
//! Intensity is absolute: a fixed tier from the period's raw maximum wind
//! speed. Severity is relative to the batch: every period's intensity score
//! is normalized against the batch's own maxima and the scores are split into
//! terciles. Adding or removing a period can therefore relabel the others.
//! Batches with fewer than `MIN_PERIODS_FOR_SEVERITY` periods get no severity
//! at all, since terciles of one or two values carry no information.

use tracing::debug;

use crate::model::{Intensity, Period, Severity};

/// Upper bounds (exclusive) of the Weak, Moderate and Strong tiers (m/s).
pub const WEAK_MAX_WIND: f64 = 10.0;
pub const MODERATE_MAX_WIND: f64 = 15.0;
pub const STRONG_MAX_WIND: f64 = 20.0;

pub const WIND_WEIGHT: f64 = 0.4;
pub const GUST_WEIGHT: f64 = 0.3;
pub const COLD_WEIGHT: f64 = 0.3;

pub const MIN_PERIODS_FOR_SEVERITY: usize = 3;

pub fn intensity_tier(max_wind: f64) -> Intensity {
    if max_wind < WEAK_MAX_WIND {
        Intensity::Weak
    } else if max_wind < MODERATE_MAX_WIND {
        Intensity::Moderate
    } else if max_wind < STRONG_MAX_WIND {
        Intensity::Strong
    } else {
        Intensity::Extreme
    }
}

/// Degrees below freezing, zero for periods that never went below 0 °C.
fn coldness(period: &Period) -> f64 {
    (-period.min_temperature).max(0.0)
}

fn ratio(value: f64, batch_max: f64) -> f64 {
    if batch_max > 0.0 { value / batch_max } else { 0.0 }
}

/// Linear-interpolated percentile of an ascending slice, `p` in [0, 1].
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Severity from a score and the batch's tercile cut points.
pub fn severity_for(score: f64, q1: f64, q2: f64) -> Severity {
    if score <= q1 {
        Severity::Minor
    } else if score <= q2 {
        Severity::Moderate
    } else {
        Severity::Severe
    }
}

/// Labels a batch of merged periods. Returns new periods in the same order.
pub fn classify_periods(periods: &[Period]) -> Vec<Period> {
    let max_wind = periods.iter().map(|p| p.max_wind).fold(0.0, f64::max);
    let max_gust = periods.iter().map(|p| p.max_gust).fold(0.0, f64::max);
    let max_cold = periods.iter().map(coldness).fold(0.0, f64::max);

    let scores: Vec<f64> = periods
        .iter()
        .map(|p| {
            WIND_WEIGHT * ratio(p.max_wind, max_wind)
                + GUST_WEIGHT * ratio(p.max_gust, max_gust)
                + COLD_WEIGHT * ratio(coldness(p), max_cold)
        })
        .collect();

    let cuts = if periods.len() >= MIN_PERIODS_FOR_SEVERITY {
        let mut sorted = scores.clone();
        sorted.sort_by(f64::total_cmp);
        percentile(&sorted, 1.0 / 3.0).zip(percentile(&sorted, 2.0 / 3.0))
    } else {
        debug!(periods = periods.len(), "too few periods for severity terciles");
        None
    };

    periods
        .iter()
        .zip(scores)
        .map(|(p, score)| Period {
            intensity: Some(intensity_tier(p.max_wind)),
            intensity_score: Some(score),
            severity: cuts.map(|(q1, q2)| severity_for(score, q1, q2)),
            ..p.clone()
        })
        .collect()
}
