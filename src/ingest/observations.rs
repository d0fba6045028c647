//! Station observation feed parsing.
//!
//! The provider hands over a JSON array with one record per timestep:
//!
//! ```text
//! [
//!   { "timestamp": "2024-01-10T06:00:00+01:00",
//!     "wind_speed": 11.2, "wind_gust": 17.0, "wind_direction": 265,
//!     "air_temperature": -6.1, "snow_depth": 42.0, ... },
//!   ...
//! ]
//! ```
//!
//! Every measurement is optional and `null` means "not reported". Timestamps
//! may carry any offset and are converted to UTC here. Records are kept in
//! file order; ordering is checked by the engine, not by the parser.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::IngestError;
use crate::model::WeatherObservation;

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ObservationRecord {
    timestamp: String,
    #[serde(default)]
    wind_speed: Option<f64>,
    #[serde(default)]
    wind_gust: Option<f64>,
    #[serde(default)]
    wind_direction: Option<f64>,
    #[serde(default)]
    air_temperature: Option<f64>,
    #[serde(default)]
    surface_temperature: Option<f64>,
    #[serde(default)]
    snow_depth: Option<f64>,
    #[serde(default)]
    precipitation: Option<f64>,
    #[serde(default)]
    precipitation_duration: Option<f64>,
    #[serde(default)]
    relative_humidity: Option<f64>,
    #[serde(default)]
    dew_point: Option<f64>,
}

impl ObservationRecord {
    fn into_observation(self, index: usize) -> Result<WeatherObservation, IngestError> {
        let timestamp = parse_timestamp(&self.timestamp).map_err(|reason| IngestError::Timestamp {
            index,
            value: self.timestamp.clone(),
            reason,
        })?;

        Ok(WeatherObservation {
            timestamp,
            wind_speed: self.wind_speed,
            wind_gust: self.wind_gust,
            wind_direction: self.wind_direction,
            air_temperature: self.air_temperature,
            surface_temperature: self.surface_temperature,
            snow_depth: self.snow_depth,
            precipitation: self.precipitation,
            precipitation_duration: self.precipitation_duration,
            relative_humidity: self.relative_humidity,
            dew_point: self.dew_point,
        })
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses an RFC 3339 timestamp and converts it to UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// Parses a JSON array of observation records.
///
/// # Errors
/// - `IngestError::Parse`: not a JSON array of records, or a field has the
///   wrong type.
/// - `IngestError::Timestamp`: a record's timestamp is not RFC 3339.
pub fn parse_observations(json: &str) -> Result<Vec<WeatherObservation>, IngestError> {
    let records: Vec<ObservationRecord> =
        serde_json::from_str(json).map_err(|e| IngestError::Parse(e.to_string()))?;

    let observations = records
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.into_observation(i))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(records = observations.len(), "parsed observation feed");
    Ok(observations)
}

/// Reads and parses an observation file.
pub fn load_observations(path: impl AsRef<Path>) -> Result<Vec<WeatherObservation>, IngestError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_observations(&contents)
}
