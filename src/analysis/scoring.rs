//! Per-timestep risk scoring.
//!
//! One parametrized scorer covers every station and tuning: tier thresholds
//! and weights come from the `ParameterSet`, the shape of each factor is
//! fixed here.
//!
//! # Normalization convention
//!
//! Each factor (wind, temperature, snow) is a raw value in [0, 1]. Its
//! sub-score is `factor * weight / weight_sum`, so the sub-scores add up to a
//! total in [0, 1] for any set of non-negative weights.

use crate::config::ParameterSet;
use crate::model::{RiskLevel, RiskScore};
use crate::normalize::NormalizedObservation;
use crate::wind::{DirectionStability, rolling_stability, successive_deltas};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Wind factor for speeds at or above `wind_strong`.
pub const STRONG_WIND_FACTOR: f64 = 0.7;

/// Fraction of the strong-wind factor earned at or above `wind_moderate`.
pub const MODERATE_WIND_FRACTION: f64 = 0.5;

/// Added to the wind factor when the gust reaches `wind_gust`.
pub const GUST_BONUS: f64 = 0.15;

/// Largest direction-change bonus, reached at a 180° swing.
pub const DIRECTION_BONUS_MAX: f64 = 0.15;

/// Level bin edges on the normalized total.
pub const MODERATE_LEVEL: f64 = 0.3;
pub const HIGH_LEVEL: f64 = 0.5;
pub const CRITICAL_LEVEL: f64 = 0.7;

/// Deltas in the rolling direction-stability window.
pub const STABILITY_WINDOW: usize = 3;

// ---------------------------------------------------------------------------
// Factors
// ---------------------------------------------------------------------------

/// Maps a normalized total onto the fixed level bins.
pub fn risk_level(total: f64) -> RiskLevel {
    if total < MODERATE_LEVEL {
        RiskLevel::Low
    } else if total < HIGH_LEVEL {
        RiskLevel::Moderate
    } else if total < CRITICAL_LEVEL {
        RiskLevel::High
    } else {
        RiskLevel::Critical
    }
}

/// Direction-change bonus, linear from 0 at the threshold to the maximum at
/// a full reversal.
pub fn direction_bonus(direction_change: Option<f64>, params: &ParameterSet) -> f64 {
    if !params.track_direction_change {
        return 0.0;
    }
    let threshold = params.wind_direction_change;
    match direction_change {
        Some(delta) if delta > threshold && threshold < 180.0 => {
            (DIRECTION_BONUS_MAX * (delta - threshold) / (180.0 - threshold)).min(DIRECTION_BONUS_MAX)
        }
        _ => 0.0,
    }
}

/// Raw wind factor in [0, 1] and the part of it due to direction change.
pub fn wind_factor(
    speed: f64,
    gust: f64,
    direction_change: Option<f64>,
    params: &ParameterSet,
) -> (f64, f64) {
    let base = if speed >= params.wind_strong {
        STRONG_WIND_FACTOR
    } else if speed >= params.wind_moderate {
        STRONG_WIND_FACTOR * MODERATE_WIND_FRACTION
    } else {
        0.0
    };
    let gust_bonus = if gust >= params.wind_gust { GUST_BONUS } else { 0.0 };
    let dir_bonus = direction_bonus(direction_change, params);

    ((base + gust_bonus + dir_bonus).clamp(0.0, 1.0), dir_bonus)
}

/// Full at or below `temperature_cold`, zero at or above `temperature_cool`,
/// linear in between.
pub fn temperature_factor(temperature: f64, params: &ParameterSet) -> f64 {
    let (cold, cool) = (params.temperature_cold, params.temperature_cool);
    if temperature <= cold {
        1.0
    } else if temperature >= cool {
        0.0
    } else {
        (cool - temperature) / (cool - cold)
    }
}

/// Piecewise-linear on |delta| through (0, 0), (low, 1/3), (moderate, 2/3)
/// and (high, 1). Interpolating inside each band avoids jumps at the tier
/// boundaries.
pub fn snow_factor(delta: f64, params: &ParameterSet) -> f64 {
    let d = delta.abs();
    let (low, moderate, high) = (params.snow_change_low, params.snow_change_moderate, params.snow_change_high);
    let third = 1.0 / 3.0;
    if d >= high {
        1.0
    } else if d >= moderate {
        2.0 * third + third * (d - moderate) / (high - moderate)
    } else if d >= low {
        third + third * (d - low) / (moderate - low)
    } else {
        third * d / low
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Scores one normalized observation. `direction_change` is the angular
/// change from the previous sample; `stability` the rolling classification
/// ending at this sample.
///
/// An observation whose wind, temperature and snow depth were all
/// unrecoverable scores zero and is flagged `degraded`; one bad read must not
/// abort a batch.
pub fn score_observation(
    obs: &NormalizedObservation,
    direction_change: Option<f64>,
    stability: Option<DirectionStability>,
    params: &ParameterSet,
) -> RiskScore {
    let degraded = obs.wind_speed.is_defaulted()
        && obs.air_temperature.is_defaulted()
        && obs.snow_depth.is_defaulted();

    if degraded {
        return RiskScore {
            timestamp: obs.timestamp,
            wind: 0.0,
            temperature: 0.0,
            snow: 0.0,
            direction_bonus: 0.0,
            total: 0.0,
            level: RiskLevel::Low,
            direction_change,
            direction_stability: stability,
            degraded: true,
        };
    }

    let weight_sum = params.weight_sum();
    let (wf, dir_bonus) = wind_factor(obs.wind_speed.value, obs.wind_gust.value, direction_change, params);
    let wind = wf * params.weight_wind / weight_sum;
    let temperature = temperature_factor(obs.air_temperature.value, params) * params.weight_temperature / weight_sum;
    let snow = snow_factor(obs.snow_delta, params) * params.weight_snow / weight_sum;
    let total = (wind + temperature + snow).clamp(0.0, 1.0);

    RiskScore {
        timestamp: obs.timestamp,
        wind,
        temperature,
        snow,
        direction_bonus: dir_bonus * params.weight_wind / weight_sum,
        total,
        level: risk_level(total),
        direction_change,
        direction_stability: stability,
        degraded,
    }
}

/// Scores a whole normalized sequence, one score per observation in order.
pub fn score_sequence(normalized: &[NormalizedObservation], params: &ParameterSet) -> Vec<RiskScore> {
    let directions: Vec<Option<f64>> = normalized.iter().map(|o| o.wind_direction).collect();
    let deltas = successive_deltas(&directions);
    let stability = rolling_stability(&deltas, STABILITY_WINDOW);

    normalized
        .iter()
        .zip(deltas.iter().zip(&stability))
        .map(|(obs, (delta, stab))| score_observation(obs, *delta, *stab, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{NormalizedValue, Quality};
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};

    fn measured(value: f64) -> NormalizedValue {
        NormalizedValue { value, quality: Quality::Measured }
    }

    fn defaulted() -> NormalizedValue {
        NormalizedValue { value: 0.0, quality: Quality::Defaulted }
    }

    fn obs(wind: f64, temperature: f64, snow_delta: f64) -> NormalizedObservation {
        NormalizedObservation {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            wind_speed: measured(wind),
            wind_gust: measured(wind),
            wind_direction: None,
            air_temperature: measured(temperature),
            surface_temperature: measured(temperature),
            snow_depth: measured(20.0),
            relative_humidity: measured(80.0),
            dew_point: measured(temperature - 2.0),
            precipitation: 0.0,
            precipitation_duration: 0.0,
            snow_delta,
        }
    }

    #[test]
    fn test_level_bins() {
        assert_eq!(risk_level(0.0), RiskLevel::Low);
        assert_eq!(risk_level(0.29), RiskLevel::Low);
        assert_eq!(risk_level(0.3), RiskLevel::Moderate);
        assert_eq!(risk_level(0.5), RiskLevel::High);
        assert_eq!(risk_level(0.7), RiskLevel::Critical);
        assert_eq!(risk_level(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_wind_tiers() {
        let p = ParameterSet::default();
        assert_eq!(wind_factor(4.0, 4.0, None, &p).0, 0.0);
        assert_abs_diff_eq!(wind_factor(7.0, 7.0, None, &p).0, 0.35, epsilon = 1e-12);
        assert_abs_diff_eq!(wind_factor(12.0, 12.0, None, &p).0, 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(wind_factor(12.0, 16.0, None, &p).0, 0.85, epsilon = 1e-12);
    }

    #[test]
    fn test_wind_score_monotonic_across_tiers() {
        let p = ParameterSet::default();
        let mut last = -1.0;
        for tenths in 0..250 {
            let speed = tenths as f64 / 10.0;
            let s = score_observation(&obs(speed, -3.0, 0.2), None, None, &p);
            assert!(s.wind >= last, "wind sub-score dropped at {} m/s", speed);
            last = s.wind;
        }
    }

    #[test]
    fn test_direction_bonus_scales_and_caps() {
        let p = ParameterSet::default();
        assert_eq!(direction_bonus(Some(30.0), &p), 0.0);
        assert_eq!(direction_bonus(Some(45.0), &p), 0.0);
        assert_abs_diff_eq!(direction_bonus(Some(112.5), &p), DIRECTION_BONUS_MAX / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(direction_bonus(Some(180.0), &p), DIRECTION_BONUS_MAX, epsilon = 1e-12);
        assert_eq!(direction_bonus(None, &p), 0.0);
    }

    #[test]
    fn test_direction_bonus_disabled() {
        let p = ParameterSet { track_direction_change: false, ..ParameterSet::default() };
        assert_eq!(direction_bonus(Some(180.0), &p), 0.0);
    }

    #[test]
    fn test_temperature_interpolates_between_cold_and_cool() {
        let p = ParameterSet::default();
        assert_eq!(temperature_factor(-15.0, &p), 1.0);
        assert_eq!(temperature_factor(-10.0, &p), 1.0);
        assert_abs_diff_eq!(temperature_factor(-3.0, &p), 0.3, epsilon = 1e-12);
        assert_eq!(temperature_factor(0.0, &p), 0.0);
        assert_eq!(temperature_factor(5.0, &p), 0.0);
    }

    #[test]
    fn test_snow_factor_is_continuous_at_tier_edges() {
        let p = ParameterSet::default();
        for edge in [p.snow_change_low, p.snow_change_moderate, p.snow_change_high] {
            let below = snow_factor(edge - 1e-9, &p);
            let at = snow_factor(edge, &p);
            assert!((at - below).abs() < 1e-6, "jump at {}: {} -> {}", edge, below, at);
        }
        assert_eq!(snow_factor(0.0, &p), 0.0);
        assert_eq!(snow_factor(-5.0, &p), 1.0);
        assert_abs_diff_eq!(snow_factor(0.75, &p), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_sub_scores_sum_to_total() {
        let p = ParameterSet::default();
        let s = score_observation(&obs(12.0, -3.0, 0.2), None, None, &p);
        assert_abs_diff_eq!(s.wind + s.temperature + s.snow, s.total, epsilon = 1e-12);
        assert!(s.total <= 1.0);
    }

    #[test]
    fn test_extreme_conditions_reach_critical() {
        let p = ParameterSet::default();
        let mut o = obs(25.0, -20.0, 5.0);
        o.wind_gust = measured(30.0);
        let s = score_observation(&o, Some(180.0), None, &p);
        assert_abs_diff_eq!(s.total, 1.0, epsilon = 1e-12);
        assert_eq!(s.level, RiskLevel::Critical);
    }

    #[test]
    fn test_degraded_observation_scores_zero() {
        let p = ParameterSet::default();
        let mut o = obs(12.0, -20.0, 3.0);
        o.wind_speed = defaulted();
        o.air_temperature = defaulted();
        o.snow_depth = defaulted();
        let s = score_observation(&o, None, None, &p);
        assert!(s.degraded);
        assert_eq!(s.total, 0.0);
        assert_eq!(s.level, RiskLevel::Low);
    }

    #[test]
    fn test_partially_defaulted_observation_uses_neutral_value() {
        // Temperature defaulted to 0.0 °C scores as 0.0 °C, which is the
        // cool threshold under the default parameters.
        let p = ParameterSet::default();
        let mut o = obs(12.0, -20.0, 0.0);
        o.air_temperature = defaulted();
        let s = score_observation(&o, None, None, &p);
        assert!(!s.degraded);
        assert_eq!(s.temperature, 0.0);
        assert!(s.wind > 0.0);
    }

    #[test]
    fn test_score_sequence_tracks_direction_changes() {
        let p = ParameterSet::default();
        let mut seq = vec![obs(12.0, -3.0, 0.0), obs(12.0, -3.0, 0.0), obs(12.0, -3.0, 0.0)];
        seq[0].wind_direction = Some(10.0);
        seq[1].wind_direction = Some(350.0);
        seq[2].wind_direction = Some(170.0);
        let scores = score_sequence(&seq, &p);
        assert_eq!(scores.len(), 3);
        assert_eq!(scores[0].direction_change, None);
        assert_abs_diff_eq!(scores[1].direction_change.unwrap(), 20.0, epsilon = 1e-9);
        assert_eq!(scores[1].direction_bonus, 0.0);
        assert!(scores[2].direction_bonus > 0.0);
        assert!(scores[2].total > scores[1].total);
    }
}
