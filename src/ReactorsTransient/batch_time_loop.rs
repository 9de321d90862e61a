use super::observers::RoundObserver;
use super::reactor_batch::{ReactorBatch, SampleSlot, SampleStatus};
use super::transient_integrator::TransientIntegrator;
use super::transient_problem::TransientProblem;
use crate::Batch::dispatcher::BatchDispatcher;
use crate::Batch::errors::{BatchError, SampleFailure};
use crate::Batch::execution::{ExecutionContext, TeamMember};
use crate::Batch::scratch::TeamArena;
use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every sample reached `t_end`, or the batch-mean time passed it.
    ReachedEnd,
    IterationCap,
    /// No sample left to advance: each one either finished or failed.
    NoActiveSamples,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopSummary {
    pub rounds: usize,
    pub mean_time: f64,
    pub stop_reason: StopReason,
    pub finished: usize,
    /// `(sample, failure, round)`
    pub failures: Vec<(usize, SampleFailure, usize)>,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

/// Host-side driver: one integrator dispatch per round, then reduction of the sample
/// times, re-seeding of the descriptors and the round observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchTimeLoop {
    pub t_end: f64,
    pub max_num_time_iterations: usize,
    pub label: &'static str,
}

impl BatchTimeLoop {
    pub fn new(label: &'static str, t_end: f64, max_num_time_iterations: usize) -> Self {
        BatchTimeLoop {
            t_end,
            max_num_time_iterations,
            label,
        }
    }

    pub fn run<P: TransientProblem>(
        &self,
        ctx: &ExecutionContext,
        dispatcher: &mut BatchDispatcher,
        integrator: &TransientIntegrator<'_, P>,
        batch: &mut ReactorBatch,
        observers: &mut [&mut dyn RoundObserver],
    ) -> Result<LoopSummary, BatchError> {
        let label = self.label;
        let problem = integrator.problem();
        BatchDispatcher::validate(ctx, label, &batch.tadv, |tadv| tadv.check())?;
        let extent = problem.workspace();
        info!(
            "{label}: {} samples, {} equations ({} differential), t_end = {:e}, at most {} rounds",
            batch.n_samples(),
            problem.number_of_equations(),
            problem.number_of_time_odes(),
            self.t_end,
            self.max_num_time_iterations
        );
        for observer in observers.iter_mut() {
            observer.on_start(batch)?;
        }

        let mut round = 0;
        let mut mean_time = batch.mean_time();
        while round < self.max_num_time_iterations && mean_time <= self.t_end && batch.any_active() {
            let mut slots = batch.slots();
            dispatcher.dispatch_validated(
                ctx,
                label,
                extent,
                &mut slots,
                |slot| match *slot.status {
                    SampleStatus::Failed { .. } => Ok(()),
                    _ => problem.check_sample(&*slot.state, &*slot.site_fraction),
                },
                |member, slot, arena| advance_sample(integrator, round, member, slot, arena),
            )?;
            drop(slots);
            round += 1;
            mean_time = batch.mean_time();
            batch.reseed();
            for observer in observers.iter_mut() {
                observer.on_round(round - 1, batch)?;
            }
        }

        let stop_reason = if batch.count_finished() == batch.n_samples() {
            StopReason::ReachedEnd
        } else if !batch.any_active() {
            StopReason::NoActiveSamples
        } else if mean_time > self.t_end {
            StopReason::ReachedEnd
        } else {
            StopReason::IterationCap
        };
        let summary = LoopSummary {
            rounds: round,
            mean_time,
            stop_reason,
            finished: batch.count_finished(),
            failures: batch.failures(),
            accepted_steps: batch.counters.iter().map(|c| c.accepted).sum(),
            rejected_steps: batch.counters.iter().map(|c| c.rejected).sum(),
        };
        if summary.failures.is_empty() {
            info!(
                "{label}: stopped after {} rounds ({:?}), mean time {:e}",
                summary.rounds, summary.stop_reason, summary.mean_time
            );
        } else {
            warn!(
                "{label}: stopped after {} rounds ({:?}) with {} failed samples",
                summary.rounds,
                summary.stop_reason,
                summary.failures.len()
            );
        }
        for observer in observers.iter_mut() {
            observer.on_finish(&summary, batch)?;
        }
        Ok(summary)
    }
}

fn advance_sample<P: TransientProblem>(
    integrator: &TransientIntegrator<'_, P>,
    round: usize,
    member: &TeamMember,
    slot: &mut SampleSlot<'_>,
    arena: &mut TeamArena<'_>,
) -> Result<(), BatchError> {
    if let SampleStatus::Failed { .. } = *slot.status {
        return Ok(());
    }
    let report = integrator.advance(member, slot.tadv, slot.state, slot.site_fraction, arena)?;
    *slot.t = report.t;
    *slot.dt = report.dt;
    slot.counters.accepted += report.accepted_steps;
    slot.counters.rejected += report.rejected_steps;
    *slot.status = match report.failure {
        Some(failure) => SampleStatus::Failed { failure, round },
        None if report.t >= slot.tadv.t_end => SampleStatus::Finished,
        None => SampleStatus::Active,
    };
    Ok(())
}
