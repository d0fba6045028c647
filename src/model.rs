//! Core data types for the snow-drift risk engine.
//!
//! This module defines the shared domain model imported by all other modules:
//! raw observations as handed over by the weather data provider, per-timestep
//! risk scores, and the aggregated risk periods produced by the detector,
//! merger and classifier. It contains no logic beyond small label helpers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::wind::DirectionStability;

// ---------------------------------------------------------------------------
// Observation types
// ---------------------------------------------------------------------------

/// One telemetry sample from a weather station.
///
/// Every measurement is optional: `None` means the station did not report
/// the field for this timestamp, which is a different state from a reported
/// zero. Timestamps must already be normalized to UTC by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub timestamp: DateTime<Utc>,
    /// Mean wind speed over the interval (m/s).
    #[serde(default)]
    pub wind_speed: Option<f64>,
    /// Maximum gust over the interval (m/s).
    #[serde(default)]
    pub wind_gust: Option<f64>,
    /// Compass direction the wind blows from (degrees, 0–360).
    #[serde(default)]
    pub wind_direction: Option<f64>,
    #[serde(default)]
    pub air_temperature: Option<f64>,
    #[serde(default)]
    pub surface_temperature: Option<f64>,
    /// Snow thickness (cm). The feed reports -1.0 for confirmed bare ground.
    #[serde(default)]
    pub snow_depth: Option<f64>,
    /// Precipitation amount over the interval (mm).
    #[serde(default)]
    pub precipitation: Option<f64>,
    /// Minutes of precipitation within the interval.
    #[serde(default)]
    pub precipitation_duration: Option<f64>,
    #[serde(default)]
    pub relative_humidity: Option<f64>,
    #[serde(default)]
    pub dew_point: Option<f64>,
}

impl WeatherObservation {
    /// An observation with only a timestamp; every field unmeasured.
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Risk scores
// ---------------------------------------------------------------------------

/// Discrete risk level derived from the normalized total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Score for a single timestep. Sub-scores are weighted contributions and
/// always sum to `total`, which lies in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScore {
    pub timestamp: DateTime<Utc>,
    pub wind: f64,
    pub temperature: f64,
    pub snow: f64,
    /// Portion of `wind` contributed by a significant direction change.
    pub direction_bonus: f64,
    pub total: f64,
    pub level: RiskLevel,
    /// Angular change from the previous measured direction, in degrees.
    pub direction_change: Option<f64>,
    pub direction_stability: Option<DirectionStability>,
    /// Wind, temperature and snow depth were all unrecoverable.
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// Intensity tier from the raw maximum wind speed of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Intensity {
    Weak,
    Moderate,
    Strong,
    Extreme,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Weak => "weak",
            Intensity::Moderate => "moderate",
            Intensity::Strong => "strong",
            Intensity::Extreme => "extreme",
        }
    }
}

/// Batch-relative severity label (tercile of the batch's intensity scores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// An elevated-risk episode spanning observations `start_index..=end_index`.
///
/// Raw periods come out of the detector, merged periods out of the merger,
/// and classified periods out of the severity classifier. Each stage builds
/// new values; none of them edits a period in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Period {
    pub id: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub start_index: usize,
    pub end_index: usize,
    /// Number of observations spanned by `[start, end]`.
    pub duration: usize,
    /// Observations in the span whose score exceeded the risk threshold.
    pub qualifying_samples: usize,
    pub max_score: f64,
    pub mean_score: f64,
    pub max_wind: f64,
    pub mean_wind: f64,
    pub max_gust: f64,
    pub min_temperature: f64,
    pub mean_temperature: f64,
    /// Largest absolute per-step snow-depth change (cm).
    pub max_snow_change: f64,
    /// Sum of per-step snow-depth changes (cm).
    pub net_snow_change: f64,
    pub total_precipitation: f64,
    /// Steps whose direction change exceeded the configured threshold.
    pub direction_changes: usize,
    pub dominant_direction: Option<f64>,
    pub direction_stability: Option<DirectionStability>,
    pub intensity: Option<Intensity>,
    pub intensity_score: Option<f64>,
    pub severity: Option<Severity>,
}

impl Period {
    /// Wall-clock length of the period in hours.
    pub fn span_hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }
}

/// Signed difference `later - earlier` in fractional hours (millisecond
/// precision, so a gap just past a limit never rounds back onto it).
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    later.signed_duration_since(earlier).num_milliseconds() as f64 / 3_600_000.0
}
