//! Parameter set loader - parses parameters.toml
//!
//! Separates scoring thresholds and weights from code, making it easy to
//! tune a station, run sensitivity sweeps, or accept a parameter set from an
//! external optimizer without recompiling. The engine never trusts the
//! supplier: every set goes through `ParameterSet::validate` before use.
//!
//! Each numeric parameter has a hard (valid) range, whose violation is a
//! `ConfigurationError`, and a narrower recommended range, whose violation is
//! only a `SoftBoundsWarning`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::{ConfigurationError, SoftBoundsWarning};

/// Default parameter file, relative to the working directory.
pub const DEFAULT_PARAMETERS_PATH: &str = "parameters.toml";

/// Environment variable overriding the parameter file path.
pub const PARAMETERS_ENV_VAR: &str = "DRIFTMON_PARAMS";

// ---------------------------------------------------------------------------
// Parameter types
// ---------------------------------------------------------------------------

/// Thresholds, weights and period rules for one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    /// Wind speed for partial wind contribution (m/s).
    pub wind_moderate: f64,
    /// Wind speed for full wind contribution (m/s).
    pub wind_strong: f64,
    /// Gust speed that earns the gust bonus (m/s).
    pub wind_gust: f64,
    /// Direction change that starts earning the direction bonus (°).
    pub wind_direction_change: f64,
    /// Temperature at which the temperature factor starts rising (°C).
    pub temperature_cool: f64,
    /// Temperature at or below which the temperature factor is full (°C).
    pub temperature_cold: f64,
    /// Snow-depth change per step for the low tier (cm).
    pub snow_change_low: f64,
    pub snow_change_moderate: f64,
    pub snow_change_high: f64,
    pub weight_wind: f64,
    pub weight_temperature: f64,
    pub weight_snow: f64,
    /// Minimum qualifying run length, in samples.
    pub min_duration: usize,
    /// Largest silent gap bridged when merging periods (hours).
    pub max_gap: f64,
    /// Score a timestep must exceed to qualify.
    pub risk_threshold: f64,
    #[serde(default = "default_true")]
    pub track_direction_change: bool,
    #[serde(default)]
    pub normalization: NormalizationSettings,
}

/// Gap repair and smoothing rules applied before scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationSettings {
    /// Longest interior run of missing samples that is interpolated.
    pub max_interpolation_gap: usize,
    /// Samples filled at each sequence edge from the nearest known value.
    pub max_edge_fill: usize,
    /// Centered moving-average window for snow depth (odd).
    pub smoothing_window: usize,
}

fn default_true() -> bool {
    true
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            max_interpolation_gap: 3,
            max_edge_fill: 2,
            smoothing_window: 3,
        }
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            wind_moderate: 6.0,
            wind_strong: 10.0,
            wind_gust: 15.0,
            wind_direction_change: 45.0,
            temperature_cool: 0.0,
            temperature_cold: -10.0,
            snow_change_low: 0.5,
            snow_change_moderate: 1.0,
            snow_change_high: 2.0,
            weight_wind: 0.5,
            weight_temperature: 0.25,
            weight_snow: 0.25,
            min_duration: 2,
            max_gap: 2.0,
            risk_threshold: 0.3,
            track_direction_change: true,
            normalization: NormalizationSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Hard and recommended range for one numeric parameter.
#[derive(Debug, Clone, Copy)]
pub struct FieldBounds {
    pub field: &'static str,
    pub min: f64,
    pub max: f64,
    pub recommended_min: f64,
    pub recommended_max: f64,
}

const fn bounds(
    field: &'static str,
    min: f64,
    max: f64,
    recommended_min: f64,
    recommended_max: f64,
) -> FieldBounds {
    FieldBounds { field, min, max, recommended_min, recommended_max }
}

pub const WIND_MODERATE: FieldBounds = bounds("wind_moderate", 1.0, 25.0, 4.0, 12.0);
pub const WIND_STRONG: FieldBounds = bounds("wind_strong", 5.0, 30.0, 8.0, 20.0);
pub const WIND_GUST: FieldBounds = bounds("wind_gust", 5.0, 50.0, 10.0, 25.0);
pub const WIND_DIRECTION_CHANGE: FieldBounds = bounds("wind_direction_change", 0.0, 180.0, 20.0, 90.0);
pub const TEMPERATURE_COOL: FieldBounds = bounds("temperature_cool", -20.0, 10.0, -5.0, 3.0);
pub const TEMPERATURE_COLD: FieldBounds = bounds("temperature_cold", -40.0, 5.0, -20.0, -2.0);
pub const SNOW_CHANGE_LOW: FieldBounds = bounds("snow_change_low", 0.01, 10.0, 0.2, 2.0);
pub const SNOW_CHANGE_MODERATE: FieldBounds = bounds("snow_change_moderate", 0.02, 20.0, 0.5, 5.0);
pub const SNOW_CHANGE_HIGH: FieldBounds = bounds("snow_change_high", 0.05, 50.0, 1.0, 10.0);
pub const WEIGHT_WIND: FieldBounds = bounds("weight_wind", 0.0, 100.0, 0.0, 1.0);
pub const WEIGHT_TEMPERATURE: FieldBounds = bounds("weight_temperature", 0.0, 100.0, 0.0, 1.0);
pub const WEIGHT_SNOW: FieldBounds = bounds("weight_snow", 0.0, 100.0, 0.0, 1.0);
pub const MIN_DURATION: FieldBounds = bounds("min_duration", 1.0, 1000.0, 1.0, 12.0);
pub const MAX_GAP: FieldBounds = bounds("max_gap", 0.0, 168.0, 0.0, 12.0);
pub const RISK_THRESHOLD: FieldBounds = bounds("risk_threshold", 0.0, 1.0, 0.1, 0.9);
pub const MAX_INTERPOLATION_GAP: FieldBounds = bounds("normalization.max_interpolation_gap", 0.0, 48.0, 0.0, 6.0);
pub const MAX_EDGE_FILL: FieldBounds = bounds("normalization.max_edge_fill", 0.0, 48.0, 0.0, 6.0);
pub const SMOOTHING_WINDOW: FieldBounds = bounds("normalization.smoothing_window", 1.0, 25.0, 1.0, 7.0);

impl FieldBounds {
    /// Hard check: the value must be finite and inside `[min, max]`.
    fn check(&self, value: f64) -> Result<(), ConfigurationError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(ConfigurationError::OutOfRange {
                field: self.field,
                value,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Soft check: a warning if the value leaves the recommended range.
    fn advise(&self, value: f64) -> Option<SoftBoundsWarning> {
        (value < self.recommended_min || value > self.recommended_max).then(|| SoftBoundsWarning {
            field: self.field,
            value,
            recommended_min: self.recommended_min,
            recommended_max: self.recommended_max,
        })
    }
}

fn ordered(
    lower: &'static str,
    lower_value: f64,
    upper: &'static str,
    upper_value: f64,
) -> Result<(), ConfigurationError> {
    if lower_value < upper_value {
        Ok(())
    } else {
        Err(ConfigurationError::Ordering { lower, lower_value, upper, upper_value })
    }
}

impl ParameterSet {
    /// Every numeric parameter paired with its bounds.
    fn bounded_values(&self) -> [(FieldBounds, f64); 18] {
        let n = &self.normalization;
        [
            (WIND_MODERATE, self.wind_moderate),
            (WIND_STRONG, self.wind_strong),
            (WIND_GUST, self.wind_gust),
            (WIND_DIRECTION_CHANGE, self.wind_direction_change),
            (TEMPERATURE_COOL, self.temperature_cool),
            (TEMPERATURE_COLD, self.temperature_cold),
            (SNOW_CHANGE_LOW, self.snow_change_low),
            (SNOW_CHANGE_MODERATE, self.snow_change_moderate),
            (SNOW_CHANGE_HIGH, self.snow_change_high),
            (WEIGHT_WIND, self.weight_wind),
            (WEIGHT_TEMPERATURE, self.weight_temperature),
            (WEIGHT_SNOW, self.weight_snow),
            (MIN_DURATION, self.min_duration as f64),
            (MAX_GAP, self.max_gap),
            (RISK_THRESHOLD, self.risk_threshold),
            (MAX_INTERPOLATION_GAP, n.max_interpolation_gap as f64),
            (MAX_EDGE_FILL, n.max_edge_fill as f64),
            (SMOOTHING_WINDOW, n.smoothing_window as f64),
        ]
    }

    /// Validates the set. Hard violations are returned as the first
    /// `ConfigurationError` found; soft violations are collected, logged and
    /// returned for the caller to surface.
    pub fn validate(&self) -> Result<Vec<SoftBoundsWarning>, ConfigurationError> {
        let values = self.bounded_values();

        for (b, value) in &values {
            b.check(*value)?;
        }

        ordered("wind_moderate", self.wind_moderate, "wind_strong", self.wind_strong)?;
        ordered("temperature_cold", self.temperature_cold, "temperature_cool", self.temperature_cool)?;
        ordered("snow_change_low", self.snow_change_low, "snow_change_moderate", self.snow_change_moderate)?;
        ordered("snow_change_moderate", self.snow_change_moderate, "snow_change_high", self.snow_change_high)?;

        if self.weight_sum() <= 0.0 {
            return Err(ConfigurationError::InvalidWeights("weights must not all be zero"));
        }
        if self.normalization.smoothing_window % 2 == 0 {
            return Err(ConfigurationError::OutOfRange {
                field: SMOOTHING_WINDOW.field,
                value: self.normalization.smoothing_window as f64,
                min: SMOOTHING_WINDOW.min,
                max: SMOOTHING_WINDOW.max,
            });
        }

        let warnings: Vec<SoftBoundsWarning> =
            values.iter().filter_map(|(b, v)| b.advise(*v)).collect();
        for w in &warnings {
            warn!(field = w.field, value = w.value, "{}", w);
        }
        Ok(warnings)
    }

    /// Sum of the factor weights; the normalizing denominator for scores.
    pub fn weight_sum(&self) -> f64 {
        self.weight_wind + self.weight_temperature + self.weight_snow
    }

    /// Parses a complete parameter set from TOML. Every scoring parameter
    /// must be present; `track_direction_change` and `[normalization]` fall
    /// back to their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        let raw: RawParameters =
            toml::from_str(contents).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        raw.into_parameters()
    }
}

// ---------------------------------------------------------------------------
// TOML loading
// ---------------------------------------------------------------------------

/// Mirror of `ParameterSet` with every required field optional, so that an
/// absent field is reported by name instead of as a generic parse failure.
#[derive(Debug, Deserialize)]
struct RawParameters {
    wind_moderate: Option<f64>,
    wind_strong: Option<f64>,
    wind_gust: Option<f64>,
    wind_direction_change: Option<f64>,
    temperature_cool: Option<f64>,
    temperature_cold: Option<f64>,
    snow_change_low: Option<f64>,
    snow_change_moderate: Option<f64>,
    snow_change_high: Option<f64>,
    weight_wind: Option<f64>,
    weight_temperature: Option<f64>,
    weight_snow: Option<f64>,
    min_duration: Option<usize>,
    max_gap: Option<f64>,
    risk_threshold: Option<f64>,
    track_direction_change: Option<bool>,
    #[serde(default)]
    normalization: NormalizationSettings,
}

fn require<T>(value: Option<T>, field: &str) -> Result<T, ConfigurationError> {
    value.ok_or_else(|| ConfigurationError::MissingField(field.to_string()))
}

impl RawParameters {
    fn into_parameters(self) -> Result<ParameterSet, ConfigurationError> {
        Ok(ParameterSet {
            wind_moderate: require(self.wind_moderate, "wind_moderate")?,
            wind_strong: require(self.wind_strong, "wind_strong")?,
            wind_gust: require(self.wind_gust, "wind_gust")?,
            wind_direction_change: require(self.wind_direction_change, "wind_direction_change")?,
            temperature_cool: require(self.temperature_cool, "temperature_cool")?,
            temperature_cold: require(self.temperature_cold, "temperature_cold")?,
            snow_change_low: require(self.snow_change_low, "snow_change_low")?,
            snow_change_moderate: require(self.snow_change_moderate, "snow_change_moderate")?,
            snow_change_high: require(self.snow_change_high, "snow_change_high")?,
            weight_wind: require(self.weight_wind, "weight_wind")?,
            weight_temperature: require(self.weight_temperature, "weight_temperature")?,
            weight_snow: require(self.weight_snow, "weight_snow")?,
            min_duration: require(self.min_duration, "min_duration")?,
            max_gap: require(self.max_gap, "max_gap")?,
            risk_threshold: require(self.risk_threshold, "risk_threshold")?,
            track_direction_change: self.track_direction_change.unwrap_or(true),
            normalization: self.normalization,
        })
    }
}

/// Loads and validates a parameter file.
///
/// Unlike the engine entry point this validates eagerly, so a bad file is
/// reported at startup rather than on the first analysis.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<(ParameterSet, Vec<SoftBoundsWarning>), ConfigurationError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigurationError::Parse(format!("Failed to read {}: {}", path.display(), e)))?;

    let params = ParameterSet::from_toml_str(&contents)?;
    let warnings = params.validate()?;
    Ok((params, warnings))
}

/// Resolves the parameter file path: `DRIFTMON_PARAMS` (after loading `.env`)
/// or `parameters.toml` in the working directory.
pub fn parameters_path() -> String {
    dotenv::dotenv().ok();
    std::env::var(PARAMETERS_ENV_VAR).unwrap_or_else(|_| DEFAULT_PARAMETERS_PATH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_TOML: &str = r#"
        wind_moderate = 6.0
        wind_strong = 10.0
        wind_gust = 15.0
        wind_direction_change = 45.0
        temperature_cool = 0.0
        temperature_cold = -10.0
        snow_change_low = 0.5
        snow_change_moderate = 1.0
        snow_change_high = 2.0
        weight_wind = 0.5
        weight_temperature = 0.25
        weight_snow = 0.25
        min_duration = 2
        max_gap = 2.0
        risk_threshold = 0.3
    "#;

    #[test]
    fn test_defaults_validate_without_warnings() {
        let warnings = ParameterSet::default().validate().expect("defaults must be valid");
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    }

    #[test]
    fn test_full_toml_matches_defaults() {
        let params = ParameterSet::from_toml_str(FULL_TOML).expect("should parse");
        assert_eq!(params, ParameterSet::default());
    }

    #[test]
    fn test_missing_field_is_named() {
        let contents = FULL_TOML.replace("wind_strong = 10.0", "");
        let err = ParameterSet::from_toml_str(&contents).unwrap_err();
        assert_eq!(err, ConfigurationError::MissingField("wind_strong".to_string()));
    }

    #[test]
    fn test_normalization_table_overrides() {
        let contents = format!("{}\n[normalization]\nsmoothing_window = 5\n", FULL_TOML);
        let params = ParameterSet::from_toml_str(&contents).unwrap();
        assert_eq!(params.normalization.smoothing_window, 5);
        assert_eq!(params.normalization.max_interpolation_gap, 3);
    }

    #[test]
    fn test_wind_strong_out_of_range_is_fatal() {
        let params = ParameterSet { wind_strong: 35.0, ..ParameterSet::default() };
        match params.validate() {
            Err(ConfigurationError::OutOfRange { field, .. }) => assert_eq!(field, "wind_strong"),
            other => panic!("expected OutOfRange, got {:?}", other),
        }
    }

    #[test]
    fn test_min_duration_zero_is_fatal() {
        let params = ParameterSet { min_duration: 0, ..ParameterSet::default() };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::OutOfRange { field: "min_duration", .. })
        ));
    }

    #[test]
    fn test_negative_max_gap_is_fatal() {
        let params = ParameterSet { max_gap: -1.0, ..ParameterSet::default() };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::OutOfRange { field: "max_gap", .. })
        ));
    }

    #[test]
    fn test_nan_threshold_is_fatal() {
        let params = ParameterSet { risk_threshold: f64::NAN, ..ParameterSet::default() };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_inverted_wind_tiers_are_fatal() {
        let params = ParameterSet { wind_moderate: 12.0, wind_strong: 10.0, ..ParameterSet::default() };
        assert!(matches!(params.validate(), Err(ConfigurationError::Ordering { .. })));
    }

    #[test]
    fn test_inverted_snow_tiers_are_fatal() {
        let params = ParameterSet { snow_change_moderate: 3.0, ..ParameterSet::default() };
        assert!(matches!(
            params.validate(),
            Err(ConfigurationError::Ordering { lower: "snow_change_moderate", .. })
        ));
    }

    #[test]
    fn test_zero_weights_are_fatal() {
        let params = ParameterSet {
            weight_wind: 0.0,
            weight_temperature: 0.0,
            weight_snow: 0.0,
            ..ParameterSet::default()
        };
        assert!(matches!(params.validate(), Err(ConfigurationError::InvalidWeights(_))));
    }

    #[test]
    fn test_even_smoothing_window_is_fatal() {
        let mut params = ParameterSet::default();
        params.normalization.smoothing_window = 4;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_high_weight_is_only_a_warning() {
        let params = ParameterSet { weight_wind: 3.0, ..ParameterSet::default() };
        let warnings = params.validate().expect("soft violation must not be fatal");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "weight_wind");
    }

    #[test]
    fn test_bundled_parameters_file_is_valid() {
        let (params, warnings) =
            load_parameters(concat!(env!("CARGO_MANIFEST_DIR"), "/parameters.toml"))
                .expect("parameters.toml should load");
        assert!(warnings.is_empty());
        assert_eq!(params.min_duration, 2);
    }

    #[test]
    fn test_missing_file_is_parse_error() {
        let err = load_parameters("/nonexistent/parameters.toml").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }
}
