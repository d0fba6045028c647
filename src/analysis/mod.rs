//! Drift-risk analysis over ordered observation sequences.
//!
//! Submodules, in data-flow order:
//! - `scoring`   — per-timestep weighted risk score and level
//! - `periods`   — qualifying runs → raw periods with span aggregates
//! - `merge`     — gap-tolerant fold of raw periods into merged periods
//! - `severity`  — intensity tiers and batch-relative severity terciles
//! - `pipeline`  — validation plus the stages above, end to end
//!
//! Built on the pipeline:
//! - `streaming` — provisional/final periods over a live feed
//! - `batch`     — thread-pool fan-out over stations or parameter sets

pub mod batch;
pub mod merge;
pub mod periods;
pub mod pipeline;
pub mod scoring;
pub mod severity;
pub mod streaming;
