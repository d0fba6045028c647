//! Parallel fan-out of independent analyses.
//!
//! Separate stations, time windows and parameter sets share nothing, so each
//! job runs on its own pool thread against its own observation slice and
//! reports back over a channel. Ordering only matters inside one invocation;
//! outcomes are sorted back into job order before returning.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::mpsc;

use serde::Serialize;
use threadpool::ThreadPool;
use tracing::{info, warn};

use crate::analysis::pipeline::{Analysis, analyze};
use crate::config::ParameterSet;
use crate::error::EngineError;
use crate::model::WeatherObservation;

/// One unit of work: a labelled observation sequence and its parameters.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub label: String,
    pub observations: Arc<[WeatherObservation]>,
    pub params: ParameterSet,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub label: String,
    pub result: Result<Analysis, EngineError>,
}

/// Runs every job on a pool of `workers` threads (at least one). Outcomes
/// come back in the same order as `jobs`.
pub fn run_batch(jobs: Vec<BatchJob>, workers: usize) -> Vec<BatchOutcome> {
    let total = jobs.len();
    if total == 0 {
        return Vec::new();
    }

    let pool = ThreadPool::new(workers.clamp(1, total));
    let (tx, rx) = mpsc::channel();

    for (slot, job) in jobs.into_iter().enumerate() {
        let tx = tx.clone();
        pool.execute(move || {
            let result = analyze(&job.observations, &job.params);
            // receiver outlives the pool; a failed send means the caller is gone
            let _ = tx.send((slot, BatchOutcome { label: job.label, result }));
        });
    }
    drop(tx);

    let mut outcomes: Vec<(usize, BatchOutcome)> = rx.iter().collect();
    if outcomes.len() < total {
        warn!(expected = total, received = outcomes.len(), "batch jobs lost (worker panicked)");
    }
    outcomes.sort_by_key(|(slot, _)| *slot);

    let failed = outcomes.iter().filter(|(_, o)| o.result.is_err()).count();
    info!(jobs = total, failed, "batch complete");

    outcomes.into_iter().map(|(_, o)| o).collect()
}

/// Runs one observation sequence against several parameter sets, e.g. a
/// threshold grid. Labels are `params-<n>` in input order.
pub fn sweep(
    observations: Arc<[WeatherObservation]>,
    parameter_sets: Vec<ParameterSet>,
    workers: usize,
) -> Vec<BatchOutcome> {
    let jobs = parameter_sets
        .into_iter()
        .enumerate()
        .map(|(i, params)| BatchJob {
            label: format!("params-{}", i),
            observations: Arc::clone(&observations),
            params,
        })
        .collect();
    run_batch(jobs, workers)
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Headline numbers for one analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub observations: usize,
    pub periods: usize,
    /// Sum of the periods' wall-clock spans.
    pub total_hours: f64,
    pub peak_score: f64,
    pub by_severity: BTreeMap<String, usize>,
    pub by_intensity: BTreeMap<String, usize>,
    pub degraded: usize,
}

pub fn summarize(analysis: &Analysis) -> AnalysisSummary {
    let mut by_severity = BTreeMap::new();
    let mut by_intensity = BTreeMap::new();
    for p in &analysis.periods {
        let severity = p.severity.map_or("unlabelled", |s| s.as_str());
        *by_severity.entry(severity.to_string()).or_insert(0) += 1;
        if let Some(intensity) = p.intensity {
            *by_intensity.entry(intensity.as_str().to_string()).or_insert(0) += 1;
        }
    }

    AnalysisSummary {
        observations: analysis.scores.len(),
        periods: analysis.periods.len(),
        total_hours: analysis.periods.iter().map(|p| p.span_hours()).sum(),
        peak_score: analysis.scores.iter().map(|s| s.total).fold(0.0, f64::max),
        by_severity,
        by_intensity,
        degraded: analysis.scores.iter().filter(|s| s.degraded).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::hourly_observations;

    fn windy() -> Arc<[WeatherObservation]> {
        hourly_observations(&[3.0, 12.0, 12.0, 3.0, 3.0, 3.0, 3.0, 16.0, 16.0, 3.0], -3.0).into()
    }

    #[test]
    fn test_run_batch_preserves_job_order() {
        let jobs: Vec<BatchJob> = (0..6)
            .map(|i| BatchJob {
                label: format!("station-{}", i),
                observations: windy(),
                params: ParameterSet::default(),
            })
            .collect();
        let outcomes = run_batch(jobs, 3);
        assert_eq!(outcomes.len(), 6);
        for (i, o) in outcomes.iter().enumerate() {
            assert_eq!(o.label, format!("station-{}", i));
            assert_eq!(o.result.as_ref().unwrap().periods.len(), 2);
        }
    }

    #[test]
    fn test_failed_job_does_not_affect_others() {
        let bad = ParameterSet { risk_threshold: 2.0, ..ParameterSet::default() };
        let jobs = vec![
            BatchJob { label: "ok".into(), observations: windy(), params: ParameterSet::default() },
            BatchJob { label: "bad".into(), observations: windy(), params: bad },
            BatchJob { label: "empty".into(), observations: Arc::from(Vec::<WeatherObservation>::new()), params: ParameterSet::default() },
        ];
        let outcomes = run_batch(jobs, 2);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(EngineError::Configuration(_))));
        assert!(matches!(outcomes[2].result, Err(EngineError::InvalidInput(_))));
    }

    #[test]
    fn test_sweep_stricter_wind_threshold_finds_fewer_periods() {
        let sets: Vec<ParameterSet> = [10.0, 13.0, 20.0]
            .iter()
            .map(|w| ParameterSet { wind_strong: *w, ..ParameterSet::default() })
            .collect();
        let outcomes = sweep(windy(), sets, 4);
        let counts: Vec<usize> = outcomes.iter().map(|o| o.result.as_ref().unwrap().periods.len()).collect();
        assert_eq!(counts, vec![2, 1, 0]);
        assert_eq!(outcomes[2].label, "params-2");
    }

    #[test]
    fn test_summarize_counts_periods() {
        let analysis = analyze(&windy(), &ParameterSet::default()).unwrap();
        let summary = summarize(&analysis);
        assert_eq!(summary.observations, 10);
        assert_eq!(summary.periods, 2);
        assert_eq!(summary.total_hours, 2.0);
        assert_eq!(summary.by_severity.get("unlabelled"), Some(&2));
        assert_eq!(summary.by_intensity.get("moderate"), Some(&1));
        assert_eq!(summary.by_intensity.get("strong"), Some(&1));
        assert!(summary.peak_score > 0.4);
        assert_eq!(summary.degraded, 0);
    }

    #[test]
    fn test_empty_batch() {
        assert!(run_batch(Vec::new(), 4).is_empty());
    }
}
