use super::errors::BatchError;
use super::execution::{ExecutionContext, TeamMember};
use super::scratch::{ScratchPool, TeamArena};
use super::workspace::WorkspaceExtent;
use log::debug;
use rayon::prelude::*;

/// Runs one team per sample with an exclusive scratch slot each.
///
/// The dispatcher keeps its scratch pool between calls, so a time loop that
/// dispatches the same kernel every round allocates only once.
#[derive(Debug, Default)]
pub struct BatchDispatcher {
    scratch: ScratchPool,
}

impl BatchDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only pass over the whole batch. Reports the lowest failing index.
    pub fn validate<T, V>(
        ctx: &ExecutionContext,
        kernel: &'static str,
        samples: &[T],
        check: V,
    ) -> Result<(), BatchError>
    where
        T: Sync,
        V: Fn(&T) -> Result<(), String> + Sync,
    {
        let first_invalid = match ctx.pool() {
            Some(pool) => pool.install(|| samples.par_iter().position_first(|s| check(s).is_err())),
            None => samples.iter().position(|s| check(s).is_err()),
        };
        match first_invalid {
            None => Ok(()),
            Some(sample) => Err(BatchError::InvalidState {
                kernel,
                sample,
                reason: check(&samples[sample]).err().unwrap_or_default(),
            }),
        }
    }

    /// Executes `body` once per sample. Returns after every team has finished; the
    /// first structural error is returned.
    pub fn dispatch<T, F>(
        &mut self,
        ctx: &ExecutionContext,
        kernel: &'static str,
        extent: WorkspaceExtent,
        samples: &mut [T],
        body: F,
    ) -> Result<(), BatchError>
    where
        T: Send,
        F: Fn(&TeamMember, &mut T, &mut TeamArena<'_>) -> Result<(), BatchError> + Sync,
    {
        let league_size = samples.len();
        let team_size = ctx.team_size();
        self.scratch.reserve(league_size, extent);
        debug!(
            "{kernel}: dispatching {league_size} teams, {} reals and {} ordinals of scratch per team",
            extent.reals, extent.ordinals
        );
        let slots = self.scratch.slots(league_size);
        match ctx.pool() {
            Some(pool) => pool.install(|| {
                samples
                    .par_iter_mut()
                    .zip(slots.into_par_iter())
                    .enumerate()
                    .try_for_each(|(rank, (sample, slot))| {
                        run_team(kernel, rank, league_size, team_size, sample, slot, &body)
                    })
            }),
            None => samples
                .iter_mut()
                .zip(slots)
                .enumerate()
                .try_for_each(|(rank, (sample, slot))| {
                    run_team(kernel, rank, league_size, team_size, sample, slot, &body)
                }),
        }
    }

    /// [`Self::validate`] followed by [`Self::dispatch`]: an invalid sample aborts the
    /// call before any team body runs.
    pub fn dispatch_validated<T, V, F>(
        &mut self,
        ctx: &ExecutionContext,
        kernel: &'static str,
        extent: WorkspaceExtent,
        samples: &mut [T],
        check: V,
        body: F,
    ) -> Result<(), BatchError>
    where
        T: Send + Sync,
        V: Fn(&T) -> Result<(), String> + Sync,
        F: Fn(&TeamMember, &mut T, &mut TeamArena<'_>) -> Result<(), BatchError> + Sync,
    {
        Self::validate(ctx, kernel, samples, check)?;
        self.dispatch(ctx, kernel, extent, samples, body)
    }
}

fn run_team<T, F>(
    kernel: &'static str,
    rank: usize,
    league_size: usize,
    team_size: usize,
    sample: &mut T,
    slot: (&mut [f64], &mut [usize]),
    body: &F,
) -> Result<(), BatchError>
where
    F: Fn(&TeamMember, &mut T, &mut TeamArena<'_>) -> Result<(), BatchError>,
{
    let member = TeamMember::new(rank, league_size, team_size);
    let (reals, ordinals) = slot;
    let mut arena = TeamArena::new(kernel, reals, ordinals);
    body(&member, sample, &mut arena)
}
