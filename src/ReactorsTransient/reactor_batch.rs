use super::time_advance::TimeAdvanceDescriptor;
use crate::Batch::batch_buffer::BatchBuffer;
use crate::Batch::errors::{BatchError, SampleFailure};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleStatus {
    Active,
    /// Reached its own `t_end`; still dispatched, as a no-op.
    Finished,
    /// Stopped by a numerical failure in `round`; skipped from then on.
    Failed { failure: SampleFailure, round: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepCounters {
    pub accepted: usize,
    pub rejected: usize,
}

/// All per-sample records of a run. Every field is indexed by sample and each sample's
/// entries are only ever touched by that sample's team.
#[derive(Debug, Clone)]
pub struct ReactorBatch {
    pub state: BatchBuffer,
    pub site_fraction: BatchBuffer,
    pub tadv: Vec<TimeAdvanceDescriptor>,
    pub t: Vec<f64>,
    pub dt: Vec<f64>,
    pub status: Vec<SampleStatus>,
    pub counters: Vec<StepCounters>,
}

/// Mutable view of one sample handed to its team.
#[derive(Debug)]
pub struct SampleSlot<'a> {
    pub state: &'a mut [f64],
    pub site_fraction: &'a mut [f64],
    pub tadv: &'a mut TimeAdvanceDescriptor,
    pub t: &'a mut f64,
    pub dt: &'a mut f64,
    pub status: &'a mut SampleStatus,
    pub counters: &'a mut StepCounters,
}

impl ReactorBatch {
    /// Every sample starts from `defaults`. Fails when the gas and surface buffers do
    /// not hold the same number of samples.
    pub fn new(
        state: BatchBuffer,
        site_fraction: BatchBuffer,
        defaults: TimeAdvanceDescriptor,
    ) -> Result<Self, BatchError> {
        if state.n_samples() != site_fraction.n_samples() {
            return Err(BatchError::SampleCountMismatch {
                state: state.n_samples(),
                site_fraction: site_fraction.n_samples(),
            });
        }
        let n = state.n_samples();
        Ok(ReactorBatch {
            state,
            site_fraction,
            tadv: vec![defaults; n],
            t: vec![defaults.t_begin; n],
            dt: vec![defaults.dt; n],
            status: vec![SampleStatus::Active; n],
            counters: vec![StepCounters::default(); n],
        })
    }

    pub fn into_buffers(self) -> (BatchBuffer, BatchBuffer) {
        (self.state, self.site_fraction)
    }

    pub fn n_samples(&self) -> usize {
        self.state.n_samples()
    }

    pub fn slots(&mut self) -> Vec<SampleSlot<'_>> {
        self.state
            .rows_mut()
            .into_iter()
            .zip(self.site_fraction.rows_mut())
            .zip(self.tadv.iter_mut())
            .zip(self.t.iter_mut().zip(self.dt.iter_mut()))
            .zip(self.status.iter_mut().zip(self.counters.iter_mut()))
            .map(|((((state, site_fraction), tadv), (t, dt)), (status, counters))| SampleSlot {
                state,
                site_fraction,
                tadv,
                t,
                dt,
                status,
                counters,
            })
            .collect()
    }

    /// Mean of the sample times, summed in index order.
    pub fn mean_time(&self) -> f64 {
        if self.t.is_empty() {
            return 0.0;
        }
        self.t.iter().sum::<f64>() / self.t.len() as f64
    }

    /// Overwrites each descriptor's `t_begin`/`dt` from the sample's own achieved values.
    pub fn reseed(&mut self) {
        for ((tadv, t), dt) in self.tadv.iter_mut().zip(&self.t).zip(&self.dt) {
            tadv.reseed(*t, *dt);
        }
    }

    pub fn any_active(&self) -> bool {
        self.status.iter().any(|s| *s == SampleStatus::Active)
    }

    pub fn count_finished(&self) -> usize {
        self.status.iter().filter(|s| **s == SampleStatus::Finished).count()
    }

    pub fn failures(&self) -> Vec<(usize, SampleFailure, usize)> {
        self.status
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                SampleStatus::Failed { failure, round } => Some((i, *failure, *round)),
                _ => None,
            })
            .collect()
    }
}
