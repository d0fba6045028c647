//! driftmon_service: snow-drift risk scoring and period detection for
//! weather-station telemetry.
//!
//! # Module structure
//!
//! ```text
//! driftmon_service
//! ├── model       — shared data types (WeatherObservation, RiskScore, Period, …)
//! ├── error       — ConfigurationError, InvalidInput, IngestError, SoftBoundsWarning
//! ├── config      — ParameterSet, bounds validation, parameters.toml loader
//! ├── logging     — tracing-subscriber setup for the binaries
//! ├── wind        — circular mean, angular deltas, direction stability
//! ├── normalize   — sentinel/missing handling, gap repair, snow-depth deltas
//! ├── ingest
//! │   ├── observations — JSON observation feed parsing
//! │   └── fixtures (test only) — synthetic series and sample payloads
//! └── analysis
//!     ├── scoring   — per-timestep risk score
//!     ├── periods   — raw period detection
//!     ├── merge     — gap-tolerant period merging
//!     ├── severity  — intensity and severity labels
//!     ├── pipeline  — analyze(): the full engine
//!     ├── streaming — DriftMonitor for live feeds
//!     └── batch     — parallel runs and parameter sweeps
//! ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod wind;
