//! Test fixtures: synthetic station series and representative feed payloads.
//!
//! The JSON fixtures follow the provider's record layout (see
//! `observations.rs`) and are trimmed to the handful of records needed to
//! exercise one behaviour each.

use chrono::{Duration, TimeZone, Utc};

use crate::model::WeatherObservation;

/// Hourly observations from 2024-01-10 00:00 UTC, one per wind speed, at a
/// constant air temperature. Snow depth rises 0.2 cm per hour from 10 cm.
/// Gust and direction are not reported.
pub(crate) fn hourly_observations(winds: &[f64], temperature: f64) -> Vec<WeatherObservation> {
    let start = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    winds
        .iter()
        .enumerate()
        .map(|(i, w)| WeatherObservation {
            wind_speed: Some(*w),
            air_temperature: Some(temperature),
            snow_depth: Some(10.0 + 0.2 * i as f64),
            ..WeatherObservation::at(start + Duration::hours(i as i64))
        })
        .collect()
}

/// Three consecutive hours written with different UTC offsets: 05:00,
/// 06:00 and 07:00 UTC.
pub(crate) fn fixture_mixed_offsets_json() -> &'static str {
    r#"[
      { "timestamp": "2024-01-10T06:00:00+01:00", "wind_speed": 7.0, "air_temperature": -4.0 },
      { "timestamp": "2024-01-10T06:00:00Z", "wind_speed": 9.5, "air_temperature": -4.5 },
      { "timestamp": "2024-01-10T02:00:00-05:00", "wind_speed": 12.0, "air_temperature": -5.0 }
    ]"#
}

/// A station with a dropped wind sensor (null), no humidity probe (fields
/// absent) and the bare-ground snow sentinel.
pub(crate) fn fixture_sensor_faults_json() -> &'static str {
    r#"[
      {
        "timestamp": "2024-01-10T00:00:00Z",
        "wind_speed": 8.5,
        "wind_gust": 14.0,
        "wind_direction": 270.0,
        "air_temperature": -7.2,
        "surface_temperature": -9.0,
        "snow_depth": 35.0,
        "precipitation": 0.4,
        "precipitation_duration": 20.0
      },
      {
        "timestamp": "2024-01-10T01:00:00Z",
        "wind_speed": null,
        "wind_gust": null,
        "wind_direction": 275.0,
        "air_temperature": -7.5,
        "snow_depth": 35.4
      },
      {
        "timestamp": "2024-01-10T02:00:00Z",
        "wind_speed": 10.1,
        "wind_gust": 16.2,
        "wind_direction": 280.0,
        "air_temperature": -7.9,
        "snow_depth": -1.0,
        "precipitation": null
      }
    ]"#
}
