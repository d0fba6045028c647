//! Circular statistics for wind direction.
//!
//! Compass directions wrap at 360°, so arithmetic means and differences are
//! wrong near north: the mean of 350° and 10° is 0°, not 180°. Everything in
//! the engine that averages or compares directions goes through here, both
//! the per-timestep scorer and the period aggregation.

use serde::{Deserialize, Serialize};

/// Mean resultant length below which the circular mean is treated as
/// undefined. Directions that cancel out (e.g. 0°, 90°, 180°, 270°) produce a
/// resultant close to zero and an angle that is numerical noise.
pub const MIN_RESULTANT_LENGTH: f64 = 1e-3;

/// Mean successive change below which a direction sequence is stable (°).
pub const STABLE_MAX_DELTA: f64 = 20.0;

/// Mean successive change below which a direction sequence is moderately
/// variable; anything at or above is unstable (°).
pub const MODERATE_MAX_DELTA: f64 = 45.0;

// ---------------------------------------------------------------------------
// Circular mean
// ---------------------------------------------------------------------------

/// Mean direction of a set of angles plus the mean resultant length
/// (1.0 = all identical, 0.0 = perfectly cancelling).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resultant {
    pub direction: f64,
    pub length: f64,
}

fn is_valid_direction(d: f64) -> bool {
    d.is_finite() && (0.0..=360.0).contains(&d)
}

/// Normalizes any finite angle into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if d >= 360.0 { 0.0 } else { d }
}

/// Sine/cosine average over all valid directions. Invalid inputs (NaN,
/// outside [0, 360]) are skipped. Returns `None` if nothing valid remains.
pub fn resultant<I>(directions: I) -> Option<Resultant>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum_sin = 0.0;
    let mut sum_cos = 0.0;
    let mut n = 0usize;

    for d in directions.into_iter().filter(|d| is_valid_direction(*d)) {
        let rad = d.to_radians();
        sum_sin += rad.sin();
        sum_cos += rad.cos();
        n += 1;
    }

    if n == 0 {
        return None;
    }

    let mean_sin = sum_sin / n as f64;
    let mean_cos = sum_cos / n as f64;

    Some(Resultant {
        direction: normalize_degrees(mean_sin.atan2(mean_cos).to_degrees()),
        length: (mean_sin * mean_sin + mean_cos * mean_cos).sqrt(),
    })
}

/// Circular mean in [0, 360), or `None` when there are no valid directions or
/// the directions cancel out so that no dominant direction exists.
pub fn circular_mean<I>(directions: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    resultant(directions)
        .filter(|r| r.length >= MIN_RESULTANT_LENGTH)
        .map(|r| r.direction)
}

// ---------------------------------------------------------------------------
// Angular difference
// ---------------------------------------------------------------------------

/// Smallest angle between two directions, in [0, 180].
pub fn angular_delta(a: f64, b: f64) -> f64 {
    let d = (a - b).abs().rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Angular change between each sample and the one immediately before it,
/// aligned with the input. `None` when either direction is missing.
pub fn successive_deltas(directions: &[Option<f64>]) -> Vec<Option<f64>> {
    let valid = |d: Option<f64>| d.filter(|v| is_valid_direction(*v));
    (0..directions.len())
        .map(|i| {
            if i == 0 {
                return None;
            }
            match (valid(directions[i - 1]), valid(directions[i])) {
                (Some(prev), Some(cur)) => Some(angular_delta(prev, cur)),
                _ => None,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Stability
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionStability {
    Stable,
    Moderate,
    Unstable,
}

impl DirectionStability {
    /// Classifies a mean successive direction change (degrees).
    pub fn from_mean_delta(mean_delta: f64) -> Self {
        if mean_delta < STABLE_MAX_DELTA {
            DirectionStability::Stable
        } else if mean_delta < MODERATE_MAX_DELTA {
            DirectionStability::Moderate
        } else {
            DirectionStability::Unstable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionStability::Stable => "stable",
            DirectionStability::Moderate => "moderate",
            DirectionStability::Unstable => "unstable",
        }
    }
}

/// Stability of a whole sequence of deltas, `None` if no delta is available.
pub fn stability_of<I>(deltas: I) -> Option<DirectionStability>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = deltas
        .into_iter()
        .fold((0.0, 0usize), |(sum, n), d| (sum + d, n + 1));
    (n > 0).then(|| DirectionStability::from_mean_delta(sum / n as f64))
}

/// Rolling stability over the last `window` deltas ending at each sample.
pub fn rolling_stability(deltas: &[Option<f64>], window: usize) -> Vec<Option<DirectionStability>> {
    let window = window.max(1);
    (0..deltas.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            stability_of(deltas[from..=i].iter().flatten().copied())
        })
        .collect()
}
