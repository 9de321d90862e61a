use super::surface_chemistry::{coverage_constraint, surface_rates_frozen_gas};
use super::time_advance::{Tolerance, wrms_norm};
use crate::Batch::batch_buffer::BatchBuffer;
use crate::Batch::dense_lu::{lu_factor, lu_solve};
use crate::Batch::dispatcher::BatchDispatcher;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::{ExecutionContext, TeamMember};
use crate::Batch::scratch::TeamArena;
use crate::Batch::state_vector::{StateVector, check_site_fractions};
use crate::Batch::workspace::{KernelKind, WorkspaceSizer};
use crate::Kinetics::kinetic_model::KineticModel;
use log::{info, warn};

const JACOBIAN_DELTA: f64 = 1e-8;

/// Per-sample result of the constraint solve. `correction` is the weighted RMS norm
/// of the last Newton update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NewtonOutcome {
    Converged { iterations: usize, correction: f64 },
    /// Iteration budget exhausted, singular Jacobian or non-finite update. The site
    /// fractions of the sample are left as they were.
    NotConverged { iterations: usize, correction: f64 },
}

impl NewtonOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, NewtonOutcome::Converged { .. })
    }
}

/// Full Newton on the surface coverage constraint with the gas state held fixed.
pub struct NewtonConstraintSolver<'a> {
    model: &'a KineticModel,
    tolerance: Tolerance,
    max_iterations: usize,
}

impl<'a> NewtonConstraintSolver<'a> {
    pub fn new(model: &'a KineticModel, tolerance: Tolerance, max_iterations: usize) -> Self {
        NewtonConstraintSolver {
            model,
            tolerance,
            max_iterations,
        }
    }

    fn residual(
        &self,
        member: &TeamMember,
        state: &[f64],
        theta: &[f64],
        r: &mut [f64],
        arena: &mut TeamArena<'_>,
    ) -> Result<(), BatchError> {
        surface_rates_frozen_gas(member, state, theta, self.model, r, arena)?;
        coverage_constraint(member, theta, self.model.surface.site_density, r);
        Ok(())
    }

    /// Solves one sample in place.
    pub fn solve(
        &self,
        member: &TeamMember,
        state: &[f64],
        site_fraction: &mut [f64],
        arena: &mut TeamArena<'_>,
    ) -> Result<NewtonOutcome, BatchError> {
        let n = site_fraction.len();
        let z = arena.take(n)?;
        let r = arena.take(n)?;
        let dz = arena.take(n)?;
        let r_pert = arena.take(n)?;
        let mut jac = arena.take_matrix(n, n)?;
        let pivots = arena.take_ordinals(n)?;
        z.copy_from_slice(site_fraction);

        let mut correction = f64::INFINITY;
        for iteration in 1..=self.max_iterations {
            self.residual(member, state, z, r, &mut arena.frame())?;
            for j in 0..n {
                let saved = z[j];
                let delta = JACOBIAN_DELTA * saved.abs().max(1.0);
                z[j] = saved + delta;
                self.residual(member, state, z, r_pert, &mut arena.frame())?;
                z[j] = saved;
                for i in 0..n {
                    jac[(i, j)] = (r_pert[i] - r[i]) / delta;
                }
            }
            if lu_factor(&mut jac, pivots).is_err() {
                return Ok(NewtonOutcome::NotConverged {
                    iterations: iteration,
                    correction,
                });
            }
            dz.copy_from_slice(r);
            lu_solve(&jac, pivots, dz);
            for i in 0..n {
                z[i] -= dz[i];
            }
            correction = wrms_norm(dz, z, |_| self.tolerance);
            if !correction.is_finite() {
                return Ok(NewtonOutcome::NotConverged {
                    iterations: iteration,
                    correction,
                });
            }
            if correction <= 1.0 {
                site_fraction.copy_from_slice(z);
                return Ok(NewtonOutcome::Converged {
                    iterations: iteration,
                    correction,
                });
            }
        }
        Ok(NewtonOutcome::NotConverged {
            iterations: self.max_iterations,
            correction,
        })
    }

    /// Solves every sample of the batch. The gas state buffer is read-only.
    pub fn run_batch(
        &self,
        ctx: &ExecutionContext,
        dispatcher: &mut BatchDispatcher,
        state: &BatchBuffer,
        site_fraction: &mut BatchBuffer,
    ) -> Result<Vec<NewtonOutcome>, BatchError> {
        const KERNEL: &str = "InitialCondSurface";
        if state.n_samples() != site_fraction.n_samples() {
            return Err(BatchError::SampleCountMismatch {
                state: state.n_samples(),
                site_fraction: site_fraction.n_samples(),
            });
        }
        let ng = self.model.gas.n_spec();
        let ns = self.model.surface.n_spec();
        let mut outcomes = vec![
            NewtonOutcome::NotConverged {
                iterations: 0,
                correction: f64::INFINITY,
            };
            state.n_samples()
        ];
        let mut samples: Vec<(&[f64], &mut [f64], &mut NewtonOutcome)> = state
            .rows()
            .into_iter()
            .zip(site_fraction.rows_mut())
            .zip(outcomes.iter_mut())
            .map(|((s, z), o)| (s, z, o))
            .collect();
        let extent = WorkspaceSizer::size(KernelKind::InitialCondSurface, self.model.counts());
        dispatcher.dispatch_validated(
            ctx,
            KERNEL,
            extent,
            &mut samples,
            |(s, z, _)| {
                StateVector::new(ng, *s).check()?;
                if z.len() != ns {
                    return Err(format!("{} site fractions for {} surface species", z.len(), ns));
                }
                check_site_fractions(z)
            },
            |member, (s, z, outcome), arena| {
                **outcome = self.solve(member, s, z, arena)?;
                Ok(())
            },
        )?;

        let failed = outcomes.iter().filter(|o| !o.is_converged()).count();
        if failed > 0 {
            warn!("{KERNEL}: Newton did not converge for {failed} of {} samples", outcomes.len());
        } else {
            info!("{KERNEL}: all {} samples converged", outcomes.len());
        }
        Ok(outcomes)
    }
}
