use super::batch_time_loop::LoopSummary;
use super::reactor_batch::{ReactorBatch, SampleStatus};
use crate::Batch::errors::BatchError;
use log::{info, warn};

/// Hook called by the time loop at round boundaries only, never inside a team body.
/// `iteration` is the zero-based index of the round that just completed.
pub trait RoundObserver {
    fn on_start(&mut self, _batch: &ReactorBatch) -> Result<(), BatchError> {
        Ok(())
    }

    fn on_round(&mut self, iteration: usize, batch: &ReactorBatch) -> Result<(), BatchError>;

    fn on_finish(&mut self, _summary: &LoopSummary, _batch: &ReactorBatch) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Logs batch progress every `every` rounds and each sample failure once.
#[derive(Debug, Clone)]
pub struct ProgressLogger {
    label: &'static str,
    every: usize,
    reported: Vec<bool>,
}

impl ProgressLogger {
    pub fn new(label: &'static str, every: usize) -> Self {
        ProgressLogger {
            label,
            every: every.max(1),
            reported: Vec::new(),
        }
    }
}

impl RoundObserver for ProgressLogger {
    fn on_start(&mut self, batch: &ReactorBatch) -> Result<(), BatchError> {
        self.reported = vec![false; batch.n_samples()];
        Ok(())
    }

    fn on_round(&mut self, iteration: usize, batch: &ReactorBatch) -> Result<(), BatchError> {
        self.reported.resize(batch.n_samples(), false);
        for (i, status) in batch.status.iter().enumerate() {
            if let SampleStatus::Failed { failure, round } = status {
                if !self.reported[i] {
                    warn!("{}: sample {i} failed in round {round}: {failure}", self.label);
                    self.reported[i] = true;
                }
            }
        }
        if iteration % self.every == 0 {
            let (t_min, t_max) = batch
                .t
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(*t), hi.max(*t)));
            info!(
                "{}: round {iteration}, mean t = {:e}, t in [{:e}, {:e}], {} finished",
                self.label,
                batch.mean_time(),
                t_min,
                t_max,
                batch.count_finished()
            );
        }
        Ok(())
    }
}
