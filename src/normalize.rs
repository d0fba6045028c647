//! Field normalization: turns raw, gappy station telemetry into complete
//! numeric series the scorer can consume.
//!
//! # Process
//!
//! 1. **Classification** — each raw value is `Measured`, the snow-depth
//!    `Sentinel` (-1.0, "sensor confirms bare ground", mapped to 0), or
//!    `Missing` (absent, non-finite, out of range, or implausible).
//! 2. **Interpolation** — interior runs of missing samples no longer than
//!    `max_interpolation_gap` are linearly interpolated by timestamp.
//! 3. **Edge extension** — missing samples at the start or end of the
//!    sequence take the nearest known value, at most `max_edge_fill` deep.
//! 4. **Neutral default** — whatever is still missing becomes `0.0` and is
//!    marked `Defaulted`. This silently changes scoring, so it is counted in
//!    the `NormalizationReport` and logged.
//!
//! Snow depth is additionally smoothed with a centered moving average before
//! first differences are taken, so a single noisy sample does not read as a
//! rapid snow-depth change. Differences are clamped to a plausible range.
//! A delta whose smoothing window or difference touches a `Defaulted` depth
//! is held at 0: the neutral default is not a depth reading, and differencing
//! against it would turn a sensor dropout into a full-scale snow change.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::NormalizationSettings;
use crate::model::WeatherObservation;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Raw snow depth meaning "no snow on the ground", not a measurement.
pub const SNOW_DEPTH_SENTINEL: f64 = -1.0;

/// Value given to samples that could not be recovered by interpolation or
/// edge extension.
pub const NEUTRAL_DEFAULT: f64 = 0.0;

/// Plausible snow-depth change per step (cm); larger deltas are clamped.
pub const SNOW_DELTA_MIN: f64 = -10.0;
pub const SNOW_DELTA_MAX: f64 = 10.0;

/// A gust this far below the sustained speed is treated as a bad reading.
pub const GUST_TOLERANCE: f64 = 0.5;

/// Inclusive validity range of a raw field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

pub const WIND_SPEED_RANGE: ValidRange = ValidRange::new(0.0, 75.0);
pub const WIND_GUST_RANGE: ValidRange = ValidRange::new(0.0, 100.0);
pub const WIND_DIRECTION_RANGE: ValidRange = ValidRange::new(0.0, 360.0);
pub const AIR_TEMPERATURE_RANGE: ValidRange = ValidRange::new(-60.0, 50.0);
pub const SURFACE_TEMPERATURE_RANGE: ValidRange = ValidRange::new(-60.0, 70.0);
pub const SNOW_DEPTH_RANGE: ValidRange = ValidRange::new(0.0, 500.0);
pub const PRECIPITATION_RANGE: ValidRange = ValidRange::new(0.0, 500.0);
pub const PRECIPITATION_DURATION_RANGE: ValidRange = ValidRange::new(0.0, 1440.0);
pub const HUMIDITY_RANGE: ValidRange = ValidRange::new(0.0, 100.0);
pub const DEW_POINT_RANGE: ValidRange = ValidRange::new(-80.0, 40.0);

// ---------------------------------------------------------------------------
// Field states
// ---------------------------------------------------------------------------

/// Classification of a single raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldState {
    Measured(f64),
    /// The field's known-condition sentinel; normalizes to 0.
    Sentinel,
    Missing,
}

/// Classifies a raw value against its validity range and optional sentinel.
pub fn classify(raw: Option<f64>, range: ValidRange, sentinel: Option<f64>) -> FieldState {
    match raw {
        Some(v) if sentinel == Some(v) => FieldState::Sentinel,
        Some(v) if range.contains(v) => FieldState::Measured(v),
        _ => FieldState::Missing,
    }
}

/// Where a normalized value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quality {
    Measured,
    Sentinel,
    Interpolated,
    EdgeFilled,
    Defaulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedValue {
    pub value: f64,
    pub quality: Quality,
}

impl NormalizedValue {
    pub fn is_defaulted(&self) -> bool {
        self.quality == Quality::Defaulted
    }
}

/// An observation after normalization. Continuous fields are always present;
/// direction stays optional because angles are never interpolated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedObservation {
    pub timestamp: DateTime<Utc>,
    pub wind_speed: NormalizedValue,
    pub wind_gust: NormalizedValue,
    pub wind_direction: Option<f64>,
    pub air_temperature: NormalizedValue,
    pub surface_temperature: NormalizedValue,
    pub snow_depth: NormalizedValue,
    pub relative_humidity: NormalizedValue,
    pub dew_point: NormalizedValue,
    pub precipitation: f64,
    pub precipitation_duration: f64,
    /// Smoothed, clamped snow-depth change from the previous step (cm).
    pub snow_delta: f64,
}

/// Counts of how values across all continuous fields were obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationReport {
    pub measured: usize,
    pub sentinel: usize,
    pub interpolated: usize,
    pub edge_filled: usize,
    pub defaulted: usize,
    /// Raw values that were present but rejected as invalid.
    pub rejected: usize,
}

impl NormalizationReport {
    fn tally(&mut self, series: &[NormalizedValue]) {
        for v in series {
            match v.quality {
                Quality::Measured => self.measured += 1,
                Quality::Sentinel => self.sentinel += 1,
                Quality::Interpolated => self.interpolated += 1,
                Quality::EdgeFilled => self.edge_filled += 1,
                Quality::Defaulted => self.defaulted += 1,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Series repair
// ---------------------------------------------------------------------------

fn seconds_between(a: DateTime<Utc>, b: DateTime<Utc>) -> f64 {
    b.signed_duration_since(a).num_milliseconds() as f64 / 1000.0
}

/// Repairs one field's series: interpolation, edge extension, then the
/// neutral default. `times` must be the same length as `states`.
pub fn repair_series(
    states: &[FieldState],
    times: &[DateTime<Utc>],
    settings: &NormalizationSettings,
) -> Vec<NormalizedValue> {
    let n = states.len();
    let mut values: Vec<Option<NormalizedValue>> = states
        .iter()
        .map(|s| match *s {
            FieldState::Measured(v) => Some(NormalizedValue { value: v, quality: Quality::Measured }),
            FieldState::Sentinel => Some(NormalizedValue { value: 0.0, quality: Quality::Sentinel }),
            FieldState::Missing => None,
        })
        .collect();

    let mut i = 0;
    while i < n {
        if values[i].is_some() {
            i += 1;
            continue;
        }
        let mut j = i;
        while j < n && values[j].is_none() {
            j += 1;
        }
        // values[i..j] is a maximal missing run
        let before = if i > 0 { values[i - 1].map(|v| (times[i - 1], v.value)) } else { None };
        let after = if j < n { values[j].map(|v| (times[j], v.value)) } else { None };

        match (before, after) {
            (Some((t0, a)), Some((t1, b))) => {
                if j - i <= settings.max_interpolation_gap {
                    let span = seconds_between(t0, t1);
                    for k in i..j {
                        let frac = if span > 0.0 { seconds_between(t0, times[k]) / span } else { 0.0 };
                        values[k] = Some(NormalizedValue {
                            value: a + (b - a) * frac,
                            quality: Quality::Interpolated,
                        });
                    }
                }
            }
            (Some((_, a)), None) => {
                for slot in values.iter_mut().take(j.min(i + settings.max_edge_fill)).skip(i) {
                    *slot = Some(NormalizedValue { value: a, quality: Quality::EdgeFilled });
                }
            }
            (None, Some((_, b))) => {
                for slot in values.iter_mut().take(j).skip(j.saturating_sub(settings.max_edge_fill).max(i)) {
                    *slot = Some(NormalizedValue { value: b, quality: Quality::EdgeFilled });
                }
            }
            (None, None) => {}
        }
        i = j;
    }

    values
        .into_iter()
        .map(|v| v.unwrap_or(NormalizedValue { value: NEUTRAL_DEFAULT, quality: Quality::Defaulted }))
        .collect()
}

/// Centered moving average. Samples without a full window on both sides keep
/// their own value, which leaves linear trends intact at the edges.
pub fn smooth_centered(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    if half == 0 {
        return values.to_vec();
    }
    (0..values.len())
        .map(|i| {
            if i >= half && i + half < values.len() {
                values[i - half..=i + half].iter().sum::<f64>() / (2 * half + 1) as f64
            } else {
                values[i]
            }
        })
        .collect()
}

/// First differences of the smoothed series, clamped to the plausible range.
/// The first sample has no predecessor and gets 0.
pub fn snow_deltas(depths: &[f64], window: usize) -> Vec<f64> {
    let smoothed = smooth_centered(depths, window);
    let mut deltas = Vec::with_capacity(smoothed.len());
    for (i, s) in smoothed.iter().enumerate() {
        let d = if i == 0 { 0.0 } else { s - smoothed[i - 1] };
        deltas.push(d.clamp(SNOW_DELTA_MIN, SNOW_DELTA_MAX));
    }
    deltas
}

/// Zeroes every delta that depends on a `Defaulted` depth. Delta `i` reads
/// the smoothed values at `i - 1` and `i`, which together span raw samples
/// `i - 1 - window / 2 ..= i + window / 2`.
pub fn hold_defaulted_deltas(deltas: Vec<f64>, depths: &[NormalizedValue], window: usize) -> Vec<f64> {
    let half = window / 2;
    let last = depths.len().saturating_sub(1);
    deltas
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let touched = &depths[i.saturating_sub(half + 1)..=(i + half).min(last)];
            if touched.iter().any(NormalizedValue::is_defaulted) { 0.0 } else { d }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Whole-sequence normalization
// ---------------------------------------------------------------------------

type Accessor = fn(&WeatherObservation) -> Option<f64>;

fn classify_all(
    observations: &[WeatherObservation],
    get: Accessor,
    range: ValidRange,
    sentinel: Option<f64>,
) -> Vec<FieldState> {
    observations.iter().map(|o| classify(get(o), range, sentinel)).collect()
}

fn count_rejected(observations: &[WeatherObservation], get: Accessor, states: &[FieldState]) -> usize {
    observations
        .iter()
        .zip(states)
        .filter(|(o, s)| get(*o).is_some() && **s == FieldState::Missing)
        .count()
}

/// Normalizes an ordered observation sequence.
///
/// The caller is responsible for ordering; the pipeline validates it before
/// calling this.
pub fn normalize(
    observations: &[WeatherObservation],
    settings: &NormalizationSettings,
) -> (Vec<NormalizedObservation>, NormalizationReport) {
    let times: Vec<DateTime<Utc>> = observations.iter().map(|o| o.timestamp).collect();
    let mut report = NormalizationReport::default();

    let speed: Accessor = |o| o.wind_speed;
    let gust: Accessor = |o| o.wind_gust;
    let air: Accessor = |o| o.air_temperature;
    let surface: Accessor = |o| o.surface_temperature;
    let snow: Accessor = |o| o.snow_depth;
    let humidity: Accessor = |o| o.relative_humidity;
    let dew: Accessor = |o| o.dew_point;

    let speed_states = classify_all(observations, speed, WIND_SPEED_RANGE, None);
    let mut gust_states = classify_all(observations, gust, WIND_GUST_RANGE, None);
    for (g, s) in gust_states.iter_mut().zip(&speed_states) {
        if let (FieldState::Measured(gv), FieldState::Measured(sv)) = (*g, *s) {
            if gv < sv - GUST_TOLERANCE {
                *g = FieldState::Missing;
            }
        }
    }

    let fields: [(Accessor, Vec<FieldState>); 7] = [
        (speed, speed_states),
        (gust, gust_states),
        (air, classify_all(observations, air, AIR_TEMPERATURE_RANGE, None)),
        (surface, classify_all(observations, surface, SURFACE_TEMPERATURE_RANGE, None)),
        (snow, classify_all(observations, snow, SNOW_DEPTH_RANGE, Some(SNOW_DEPTH_SENTINEL))),
        (humidity, classify_all(observations, humidity, HUMIDITY_RANGE, None)),
        (dew, classify_all(observations, dew, DEW_POINT_RANGE, None)),
    ];

    let mut repaired: Vec<Vec<NormalizedValue>> = Vec::with_capacity(fields.len());
    for (get, states) in &fields {
        report.rejected += count_rejected(observations, *get, states);
        let series = repair_series(states, &times, settings);
        report.tally(&series);
        repaired.push(series);
    }

    let depths: Vec<f64> = repaired[4].iter().map(|v| v.value).collect();
    let deltas = hold_defaulted_deltas(
        snow_deltas(&depths, settings.smoothing_window),
        &repaired[4],
        settings.smoothing_window,
    );

    let normalized = observations
        .iter()
        .enumerate()
        .map(|(i, o)| {
            let direction = match classify(o.wind_direction, WIND_DIRECTION_RANGE, None) {
                FieldState::Measured(d) => Some(crate::wind::normalize_degrees(d)),
                _ => None,
            };
            let additive = |raw: Option<f64>, range: ValidRange| match classify(raw, range, None) {
                FieldState::Measured(v) => v,
                _ => 0.0,
            };
            NormalizedObservation {
                timestamp: o.timestamp,
                wind_speed: repaired[0][i],
                wind_gust: repaired[1][i],
                wind_direction: direction,
                air_temperature: repaired[2][i],
                surface_temperature: repaired[3][i],
                snow_depth: repaired[4][i],
                relative_humidity: repaired[5][i],
                dew_point: repaired[6][i],
                precipitation: additive(o.precipitation, PRECIPITATION_RANGE),
                precipitation_duration: additive(o.precipitation_duration, PRECIPITATION_DURATION_RANGE),
                snow_delta: deltas[i],
            }
        })
        .collect();

    debug!(
        samples = observations.len(),
        measured = report.measured,
        interpolated = report.interpolated,
        edge_filled = report.edge_filled,
        rejected = report.rejected,
        "normalized observation sequence"
    );
    if report.defaulted > 0 {
        warn!(defaulted = report.defaulted, "unrecoverable values replaced with neutral default 0.0");
    }

    (normalized, report)
}
