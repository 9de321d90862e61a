//! # Transient integrator
//!
//! Per-sample stiff step function. One call advances one sample by at most
//! `iterations_per_interval` attempted sub-steps of an L-stable, stiffly accurate
//! two-stage SDIRK scheme written in stage-value form, so algebraic rows are imposed
//! exactly at every stage:
//!
//! ```text
//!  gamma | gamma      0            gamma = 1 - 1/sqrt(2)
//!  1     | 1-gamma    gamma
//!  ------+-----------------
//!        | 1-gamma    gamma        (embedded first order: 1  0)
//! ```
//!
//! Each attempt forms a forward-difference Jacobian at the start of the step and
//! factors the iteration matrix `[I - h gamma J_f ; J_g]` once; both stages are then
//! solved by simplified Newton. The local error `h gamma (k2 - k1)` is measured on the
//! differential rows only.

use super::time_advance::{
    StepDecision, StepSizeController, TimeAdvanceDescriptor, ToleranceTable, wrms_norm,
};
use super::transient_problem::TransientProblem;
use crate::Batch::dense_lu::{lu_factor, lu_solve};
use crate::Batch::errors::{BatchError, RejectionCause, SampleFailure};
use crate::Batch::execution::TeamMember;
use crate::Batch::scratch::TeamArena;
use nalgebra::DMatrixViewMut;

pub const GAMMA: f64 = 1.0 - std::f64::consts::FRAC_1_SQRT_2;
/// Shrink factor after a Newton failure or an inadmissible candidate.
pub const FAILURE_SHRINK: f64 = 0.25;
const JACOBIAN_DELTA: f64 = 1e-8;

/// Outcome of one interval for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub t: f64,
    pub dt: f64,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub failure: Option<SampleFailure>,
}

enum Attempt {
    Converged { err_norm: f64 },
    NewtonFailed { iterations: usize },
    Inadmissible,
}

struct StepBuffers<'a> {
    u_n: &'a mut [f64],
    stage: &'a mut [f64],
    k1: &'a mut [f64],
    k2: &'a mut [f64],
    f: &'a mut [f64],
    r: &'a mut [f64],
    f_base: &'a mut [f64],
    f_pert: &'a mut [f64],
    matrix: DMatrixViewMut<'a, f64>,
    pivots: &'a mut [usize],
}

impl<'a> StepBuffers<'a> {
    fn take(n: usize, arena: &mut TeamArena<'a>) -> Result<Self, BatchError> {
        Ok(StepBuffers {
            u_n: arena.take(n)?,
            stage: arena.take(n)?,
            k1: arena.take(n)?,
            k2: arena.take(n)?,
            f: arena.take(n)?,
            r: arena.take(n)?,
            f_base: arena.take(n)?,
            f_pert: arena.take(n)?,
            matrix: arena.take_matrix(n, n)?,
            pivots: arena.take_ordinals(n)?,
        })
    }
}

pub struct TransientIntegrator<'p, P: TransientProblem> {
    problem: &'p P,
    tolerances: &'p ToleranceTable,
    controller: StepSizeController,
}

impl<'p, P: TransientProblem> TransientIntegrator<'p, P> {
    pub fn new(problem: &'p P, tolerances: &'p ToleranceTable) -> Self {
        TransientIntegrator {
            problem,
            tolerances,
            controller: StepSizeController::default(),
        }
    }

    pub fn with_controller(mut self, controller: StepSizeController) -> Self {
        self.controller = controller;
        self
    }

    pub fn problem(&self) -> &P {
        self.problem
    }

    /// Advances one sample from `tadv.t_begin` towards `tadv.t_end`. The state is written
    /// back only from accepted steps; a failed sample keeps its last accepted state.
    pub fn advance(
        &self,
        member: &TeamMember,
        tadv: &TimeAdvanceDescriptor,
        state: &mut [f64],
        site_fraction: &mut [f64],
        arena: &mut TeamArena<'_>,
    ) -> Result<StepReport, BatchError> {
        let mut report = StepReport {
            t: tadv.t_begin,
            dt: tadv.dt,
            accepted_steps: 0,
            rejected_steps: 0,
            failure: None,
        };
        if tadv.t_begin >= tadv.t_end {
            return Ok(report);
        }
        let n = self.problem.number_of_equations();
        let mut buf = StepBuffers::take(n, arena)?;
        self.problem.pack(state, site_fraction, buf.u_n);

        let mut t = tadv.t_begin;
        let mut dt = tadv.dt;
        let mut attempts = 0;
        while attempts < tadv.iterations_per_interval && t < tadv.t_end {
            attempts += 1;
            let h = tadv.proposed_step(t, dt);
            // rejections shrink the bounded step, not the remainder of the interval
            let bounded = dt.clamp(tadv.dt_min, tadv.dt_max);
            let attempt = self.attempt(member, t, h, tadv.max_newton_iterations, state, &mut buf, arena)?;
            let (decision, cause) = match attempt {
                Attempt::Converged { err_norm } => {
                    let base = if err_norm <= 1.0 { h } else { bounded };
                    (
                        self.controller.decide(base, err_norm, tadv.dt_min, tadv.dt_max),
                        RejectionCause::ErrorTest { err_norm },
                    )
                }
                Attempt::NewtonFailed { iterations } => (
                    self.controller.shrink(bounded, FAILURE_SHRINK, tadv.dt_min),
                    RejectionCause::NewtonDivergence { iterations },
                ),
                Attempt::Inadmissible => (
                    self.controller.shrink(bounded, FAILURE_SHRINK, tadv.dt_min),
                    RejectionCause::Inadmissible,
                ),
            };
            match decision {
                StepDecision::Accept { next_dt } => {
                    buf.u_n.copy_from_slice(buf.stage);
                    t = if h >= tadv.t_end - t { tadv.t_end } else { t + h };
                    dt = next_dt;
                    report.accepted_steps += 1;
                }
                StepDecision::Reject { next_dt } => {
                    dt = next_dt;
                    report.rejected_steps += 1;
                }
                StepDecision::Underflow { next_dt } => {
                    report.rejected_steps += 1;
                    report.failure = Some(SampleFailure::StepSizeUnderflow {
                        t,
                        dt: next_dt,
                        dt_min: tadv.dt_min,
                        cause,
                    });
                    break;
                }
            }
        }

        self.problem.unpack(buf.u_n, state, site_fraction);
        report.t = t;
        report.dt = dt;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn attempt(
        &self,
        member: &TeamMember,
        t: f64,
        h: f64,
        max_newton: usize,
        frozen: &[f64],
        buf: &mut StepBuffers<'_>,
        arena: &mut TeamArena<'_>,
    ) -> Result<Attempt, BatchError> {
        let nd = self.problem.number_of_time_odes();
        let hg = h * GAMMA;

        self.iteration_matrix(member, t, hg, frozen, buf, arena)?;
        if lu_factor(&mut buf.matrix, buf.pivots).is_err() {
            return Ok(Attempt::NewtonFailed { iterations: 0 });
        }

        // stage 1: U1 = u_n + h gamma F(U1)
        buf.k1.fill(0.0);
        buf.stage.copy_from_slice(buf.u_n);
        if let Some(iterations) = self.solve_stage(member, t + hg, hg, 0.0, max_newton, frozen, buf, arena)? {
            return Ok(Attempt::NewtonFailed { iterations });
        }
        for i in 0..nd {
            buf.k1[i] = (buf.stage[i] - buf.u_n[i]) / hg;
        }

        // stage 2: U2 = u_n + h (1 - gamma) k1 + h gamma F(U2), starting from U1
        let explicit = h * (1.0 - GAMMA);
        if let Some(iterations) = self.solve_stage(member, t + h, hg, explicit, max_newton, frozen, buf, arena)? {
            return Ok(Attempt::NewtonFailed { iterations });
        }
        if !self.problem.is_admissible(buf.stage) {
            return Ok(Attempt::Inadmissible);
        }
        for i in 0..nd {
            buf.k2[i] = (buf.stage[i] - buf.u_n[i] - explicit * buf.k1[i]) / hg;
        }

        // error h gamma (k2 - k1) on the differential rows, scaled by the larger state
        let tol = &self.tolerances.time;
        for i in 0..nd {
            buf.r[i] = hg * (buf.k2[i] - buf.k1[i]);
            buf.f[i] = buf.u_n[i].abs().max(buf.stage[i].abs());
        }
        let err_norm = wrms_norm(&buf.r[..nd], &buf.f[..nd], |i| tol[i]);
        Ok(Attempt::Converged { err_norm })
    }

    /// `[I - h gamma J_f ; J_g]` by forward differences around `u_n`.
    fn iteration_matrix(
        &self,
        member: &TeamMember,
        t: f64,
        hg: f64,
        frozen: &[f64],
        buf: &mut StepBuffers<'_>,
        arena: &mut TeamArena<'_>,
    ) -> Result<(), BatchError> {
        let n = buf.u_n.len();
        let nd = self.problem.number_of_time_odes();
        self.problem
            .compute_function(member, t, buf.u_n, frozen, buf.f_base, &mut arena.frame())?;
        for j in 0..n {
            let saved = buf.u_n[j];
            let delta = JACOBIAN_DELTA * saved.abs().max(1.0);
            buf.u_n[j] = saved + delta;
            self.problem
                .compute_function(member, t, buf.u_n, frozen, buf.f_pert, &mut arena.frame())?;
            buf.u_n[j] = saved;
            for i in 0..n {
                let jij = (buf.f_pert[i] - buf.f_base[i]) / delta;
                buf.matrix[(i, j)] = if i < nd {
                    let identity = if i == j { 1.0 } else { 0.0 };
                    identity - hg * jij
                } else {
                    jij
                };
            }
        }
        member.team_barrier();
        Ok(())
    }

    /// Simplified Newton on `U - u_n - explicit k1 - h gamma F(U) = 0` (differential rows)
    /// and `G(U) = 0` (algebraic rows). Returns `Some(iterations)` when it fails.
    #[allow(clippy::too_many_arguments)]
    fn solve_stage(
        &self,
        member: &TeamMember,
        t: f64,
        hg: f64,
        explicit: f64,
        max_newton: usize,
        frozen: &[f64],
        buf: &mut StepBuffers<'_>,
        arena: &mut TeamArena<'_>,
    ) -> Result<Option<usize>, BatchError> {
        let n = buf.u_n.len();
        let nd = self.problem.number_of_time_odes();
        let newton_tol = self.tolerances.newton;
        for iteration in 1..=max_newton {
            self.problem
                .compute_function(member, t, buf.stage, frozen, buf.f, &mut arena.frame())?;
            for i in 0..n {
                buf.r[i] = if i < nd {
                    buf.stage[i] - buf.u_n[i] - explicit * buf.k1[i] - hg * buf.f[i]
                } else {
                    buf.f[i]
                };
            }
            lu_solve(&buf.matrix, buf.pivots, buf.r);
            for i in 0..n {
                buf.stage[i] -= buf.r[i];
            }
            let norm = wrms_norm(buf.r, buf.stage, |_| newton_tol);
            if !norm.is_finite() {
                return Ok(Some(iteration));
            }
            if norm <= 1.0 {
                return Ok(None);
            }
        }
        Ok(Some(max_newton))
    }
}
