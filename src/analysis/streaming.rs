//! Live monitoring over an observation stream.
//!
//! Observations are pushed as they arrive and the engine is re-run over the
//! buffered tail on every poll. A period is provisional while it could still
//! be extended or merged. It becomes final only once more than `max_gap`
//! hours of observations have arrived after its end and no qualifying run
//! that started inside that window is still open at the tail of the stream.
//! Such a run may yet reach `min_duration` and merge, so closing the period
//! early would split one episode in two.
//!
//! Finalized periods carry their intensity tier but no severity or
//! intensity score, because both are relative to a whole batch and a stream
//! has no batch. Observations up to the end of a finalized period are
//! dropped from the buffer; indices on emitted periods stay absolute. While
//! no period is open the buffer keeps only the open qualifying run, if any,
//! plus the few samples normalization needs as context.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::analysis::periods::{Run, qualifying_flags, runs};
use crate::analysis::pipeline::run_stages;
use crate::analysis::severity::intensity_tier;
use crate::config::ParameterSet;
use crate::error::{EngineError, InvalidInput};
use crate::model::{Period, WeatherObservation, hours_between};

pub struct DriftMonitor {
    params: ParameterSet,
    buffer: Vec<WeatherObservation>,
    /// Observations already dropped from the front of the buffer.
    offset: usize,
    last_timestamp: Option<DateTime<Utc>>,
    finalized: usize,
}

impl DriftMonitor {
    /// Creates a monitor; the parameter set is validated once, here.
    pub fn new(params: ParameterSet) -> Result<Self, EngineError> {
        params.validate()?;
        Ok(Self {
            params,
            buffer: Vec::new(),
            offset: 0,
            last_timestamp: None,
            finalized: 0,
        })
    }

    /// Appends an observation. Timestamps must not go backwards.
    pub fn push(&mut self, observation: WeatherObservation) -> Result<(), EngineError> {
        if let Some(previous) = self.last_timestamp {
            if observation.timestamp < previous {
                return Err(InvalidInput::OutOfOrder {
                    index: self.offset + self.buffer.len(),
                    previous,
                    current: observation.timestamp,
                }
                .into());
            }
        }
        self.last_timestamp = Some(observation.timestamp);
        self.buffer.push(observation);
        Ok(())
    }

    /// Number of periods finalized so far.
    pub fn finalized_count(&self) -> usize {
        self.finalized
    }

    /// Observations currently held for re-analysis.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Samples kept ahead of the open tail while idle: enough for gap repair
    /// and the smoothing window to see the same neighbours as in batch.
    fn idle_context(&self) -> usize {
        let n = &self.params.normalization;
        n.max_interpolation_gap.max(n.max_edge_fill) + n.smoothing_window + 1
    }

    fn is_final(&self, period: &Period, snapshot: &Snapshot, latest: DateTime<Utc>) -> bool {
        if hours_between(period.end, latest) <= self.params.max_gap {
            return false;
        }
        match snapshot.open_run {
            Some(run) if run.start > period.end_index => {
                hours_between(period.end, self.buffer[run.start].timestamp) > self.params.max_gap
            }
            _ => true,
        }
    }

    fn snapshot(&self) -> Snapshot {
        if self.buffer.is_empty() {
            return Snapshot { periods: Vec::new(), open_run: None };
        }
        let stages = run_stages(&self.buffer, &self.params);
        let flags = qualifying_flags(&stages.scores, self.params.risk_threshold);
        let open_run = runs(&flags).last().copied().filter(|r| r.qualifying);
        Snapshot { periods: stages.merged, open_run }
    }

    /// Drops samples no future period can reach while nothing is open.
    fn trim_idle(&mut self, open_run: Option<Run>) {
        let keep_from = open_run
            .map_or(self.buffer.len(), |r| r.start)
            .saturating_sub(self.idle_context());
        if keep_from == 0 {
            return;
        }
        self.buffer.drain(..keep_from);
        self.offset += keep_from;
        debug!(dropped = keep_from, buffered = self.buffer.len(), "idle stream buffer trimmed");
    }

    fn stream_view(&self, period: Period, id: usize) -> Period {
        Period {
            id,
            start_index: period.start_index + self.offset,
            end_index: period.end_index + self.offset,
            intensity: Some(intensity_tier(period.max_wind)),
            intensity_score: None,
            severity: None,
            ..period
        }
    }

    /// Returns the periods that became final since the last poll, in order.
    pub fn poll(&mut self) -> Result<Vec<Period>, EngineError> {
        let Some(latest) = self.last_timestamp else {
            return Ok(Vec::new());
        };

        let snapshot = self.snapshot();
        if snapshot.periods.is_empty() {
            self.trim_idle(snapshot.open_run);
            return Ok(Vec::new());
        }

        let ready: Vec<&Period> = snapshot
            .periods
            .iter()
            .take_while(|p| self.is_final(p, &snapshot, latest))
            .collect();

        let Some(last) = ready.last() else {
            return Ok(Vec::new());
        };
        let consumed = last.end_index + 1;

        let out: Vec<Period> = ready
            .into_iter()
            .enumerate()
            .map(|(i, p)| self.stream_view(p.clone(), self.finalized + i + 1))
            .collect();

        for p in &out {
            info!(id = p.id, start = %p.start, end = %p.end, max_wind = p.max_wind, "period finalized");
        }

        self.buffer.drain(..consumed);
        self.offset += consumed;
        self.finalized += out.len();
        debug!(dropped = consumed, buffered = self.buffer.len(), "stream buffer trimmed");

        Ok(out)
    }

    /// The open period at the tail of the stream, if any. It may still grow,
    /// merge with a later one, or disappear if it never reaches
    /// `min_duration`.
    pub fn provisional(&self) -> Option<Period> {
        let latest = self.last_timestamp?;
        let snapshot = self.snapshot();
        snapshot
            .periods
            .iter()
            .filter(|p| !self.is_final(p, &snapshot, latest))
            .last()
            .map(|p| self.stream_view(p.clone(), self.finalized + 1))
    }
}

/// One re-analysis of the buffer.
struct Snapshot {
    periods: Vec<Period>,
    /// Qualifying run still open at the buffer tail.
    open_run: Option<Run>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::pipeline::analyze;
    use crate::ingest::fixtures::hourly_observations;

    fn feed(monitor: &mut DriftMonitor, observations: Vec<WeatherObservation>) -> Vec<Period> {
        let mut finalized = Vec::new();
        for obs in observations {
            monitor.push(obs).unwrap();
            finalized.extend(monitor.poll().unwrap());
        }
        finalized
    }

    #[test]
    fn test_period_waits_for_gap_window() {
        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let obs = hourly_observations(&[12.0, 12.0, 3.0, 3.0], -3.0);
        assert!(feed(&mut monitor, obs).is_empty());
        assert_eq!(monitor.finalized_count(), 0);
        let open = monitor.provisional().expect("open period");
        assert_eq!((open.start_index, open.end_index), (0, 1));
    }

    #[test]
    fn test_period_finalizes_after_gap_window() {
        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let obs = hourly_observations(&[12.0, 12.0, 3.0, 3.0, 3.0], -3.0);
        let finalized = feed(&mut monitor, obs);
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].id, 1);
        assert_eq!(finalized[0].severity, None);
        assert!(finalized[0].intensity.is_some());
        assert!(monitor.provisional().is_none());
        assert_eq!(monitor.buffered(), 3);
    }

    #[test]
    fn test_stream_does_not_split_merged_period() {
        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let winds = [12.0, 12.0, 3.0, 12.0, 12.0, 3.0, 3.0, 3.0];
        let finalized = feed(&mut monitor, hourly_observations(&winds, -3.0));
        assert_eq!(finalized.len(), 1);
        assert_eq!((finalized[0].start_index, finalized[0].end_index), (0, 4));
    }

    #[test]
    fn test_stream_matches_batch_boundaries() {
        let winds = [
            3.0, 12.0, 12.0, 3.0, 3.0, 3.0, 3.0, 14.0, 15.0, 16.0, 3.0, 3.0, 3.0, 3.0, 11.0, 11.0, 3.0, 3.0, 3.0,
            3.0,
        ];
        let obs = hourly_observations(&winds, -3.0);
        let batch = analyze(&obs, &ParameterSet::default()).unwrap();

        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let streamed = feed(&mut monitor, obs);

        assert_eq!(streamed.len(), batch.periods.len());
        for (s, b) in streamed.iter().zip(&batch.periods) {
            assert_eq!((s.start, s.end), (b.start, b.end));
            assert_eq!((s.start_index, s.end_index), (b.start_index, b.end_index));
            assert_eq!(s.id, b.id);
            assert_eq!(s.max_wind, b.max_wind);
        }
        assert_eq!(monitor.finalized_count(), 3);
    }

    fn assert_same_boundaries(streamed: &[Period], batch: &[Period]) {
        let s: Vec<_> = streamed.iter().map(|p| (p.start_index, p.end_index)).collect();
        let b: Vec<_> = batch.iter().map(|p| (p.start_index, p.end_index)).collect();
        assert_eq!(s, b);
    }

    #[test]
    fn test_short_run_inside_gap_window_holds_period_open() {
        let params = ParameterSet { min_duration: 3, ..ParameterSet::default() };
        let winds = [12.0, 12.0, 12.0, 3.0, 12.0, 12.0, 12.0, 3.0, 3.0, 3.0, 3.0];
        let obs = hourly_observations(&winds, -3.0);
        let batch = analyze(&obs, &params).unwrap();
        assert_eq!(batch.periods.len(), 1);

        let mut monitor = DriftMonitor::new(params).unwrap();
        let streamed = feed(&mut monitor, obs);
        assert_same_boundaries(&streamed, &batch.periods);
        assert_eq!((streamed[0].start_index, streamed[0].end_index), (0, 6));
    }

    #[test]
    fn test_irregular_samples_match_batch() {
        let params = ParameterSet { min_duration: 3, ..ParameterSet::default() };
        let minutes = [0, 60, 120, 180, 240, 270, 330, 390, 450, 540, 600];
        let winds = [12.0, 12.0, 12.0, 3.0, 12.0, 12.0, 12.0, 3.0, 3.0, 3.0, 3.0];
        let base = hourly_observations(&winds, -3.0);
        let start = base[0].timestamp;
        // 30 and 60 minute spacing; the second run starts exactly max_gap after the first
        let obs: Vec<WeatherObservation> = base
            .into_iter()
            .zip(minutes)
            .map(|(o, m)| WeatherObservation { timestamp: start + chrono::Duration::minutes(m), ..o })
            .collect();
        let batch = analyze(&obs, &params).unwrap();
        assert_eq!(batch.periods.len(), 1);

        let mut monitor = DriftMonitor::new(params).unwrap();
        let streamed = feed(&mut monitor, obs);
        assert_same_boundaries(&streamed, &batch.periods);
    }

    #[test]
    fn test_short_run_after_gap_window_does_not_hold_period() {
        let params = ParameterSet { min_duration: 3, ..ParameterSet::default() };
        let mut monitor = DriftMonitor::new(params).unwrap();
        let winds = [12.0, 12.0, 12.0, 3.0, 3.0, 3.0, 12.0, 12.0];
        let finalized = feed(&mut monitor, hourly_observations(&winds, -3.0));
        assert_eq!(finalized.len(), 1);
        assert_eq!((finalized[0].start_index, finalized[0].end_index), (0, 2));
    }

    #[test]
    fn test_buffer_stays_bounded_while_calm() {
        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let calm = vec![3.0; 500];
        assert!(feed(&mut monitor, hourly_observations(&calm, -3.0)).is_empty());
        assert!(monitor.buffered() <= monitor.idle_context(), "buffered {}", monitor.buffered());
    }

    #[test]
    fn test_long_calm_lead_in_keeps_absolute_indices() {
        let mut winds = vec![3.0; 200];
        winds.extend([12.0, 12.0, 12.0, 3.0, 3.0, 3.0]);
        let obs = hourly_observations(&winds, -3.0);
        let batch = analyze(&obs, &ParameterSet::default()).unwrap();

        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let streamed = feed(&mut monitor, obs);
        assert_same_boundaries(&streamed, &batch.periods);
        assert_eq!((streamed[0].start_index, streamed[0].end_index), (200, 202));
        assert_eq!(streamed[0].max_wind, batch.periods[0].max_wind);
    }

    #[test]
    fn test_push_rejects_out_of_order() {
        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        let obs = hourly_observations(&[3.0, 3.0], -3.0);
        monitor.push(obs[1].clone()).unwrap();
        let err = monitor.push(obs[0].clone()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(InvalidInput::OutOfOrder { index: 1, .. })));
    }

    #[test]
    fn test_new_rejects_invalid_parameters() {
        let params = ParameterSet { weight_wind: 0.0, weight_temperature: 0.0, weight_snow: 0.0, ..ParameterSet::default() };
        assert!(DriftMonitor::new(params).is_err());
    }

    #[test]
    fn test_poll_on_empty_monitor() {
        let mut monitor = DriftMonitor::new(ParameterSet::default()).unwrap();
        assert!(monitor.poll().unwrap().is_empty());
        assert!(monitor.provisional().is_none());
    }
}
