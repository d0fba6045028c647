//! Observation ingest: turning provider payloads into `WeatherObservation`s.
//!
//! - `observations` — JSON feed parsing and file loading
//! - `fixtures` (test only) — synthetic series and sample payloads

pub mod observations;

#[cfg(test)]
pub(crate) mod fixtures;
