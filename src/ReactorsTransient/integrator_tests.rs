#[cfg(test)]
mod tests {
    use crate::Batch::batch_buffer::BatchBuffer;
    use crate::Batch::dispatcher::BatchDispatcher;
    use crate::Batch::errors::{BatchError, RejectionCause, SampleFailure};
    use crate::Batch::execution::{ExecutionContext, ExecutionSpace, TeamMember};
    use crate::Batch::scratch::TeamArena;
    use crate::Batch::workspace::{KernelKind, SpeciesCounts, WorkspaceSizer};
    use crate::ReactorsTransient::fixtures::{adsorption_model, equilibrium_coverage, gas_state};
    use crate::ReactorsTransient::newton_surface::{NewtonConstraintSolver, NewtonOutcome};
    use crate::ReactorsTransient::time_advance::{
        StepDecision, StepSizeController, TimeAdvanceDescriptor, Tolerance, ToleranceTable, wrms_norm,
    };
    use crate::ReactorsTransient::transient_integrator::{StepReport, TransientIntegrator};
    use crate::ReactorsTransient::transient_problem::TransientProblem;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// `y' = -rate y`, `0 = z - 2 y`; `y` lives in the state row, `z` in the site row.
    struct Relaxation {
        rate: f64,
    }

    impl TransientProblem for Relaxation {
        fn kind(&self) -> KernelKind {
            KernelKind::SimpleSurface
        }

        fn counts(&self) -> SpeciesCounts {
            SpeciesCounts::new(0, 2)
        }

        fn number_of_time_odes(&self) -> usize {
            1
        }

        fn check_sample(&self, _state: &[f64], _site_fraction: &[f64]) -> Result<(), String> {
            Ok(())
        }

        fn pack(&self, state: &[f64], site_fraction: &[f64], u: &mut [f64]) {
            u[0] = state[0];
            u[1] = site_fraction[0];
        }

        fn unpack(&self, u: &[f64], state: &mut [f64], site_fraction: &mut [f64]) {
            state[0] = u[0];
            site_fraction[0] = u[1];
        }

        fn is_admissible(&self, u: &[f64]) -> bool {
            u.iter().all(|v| v.is_finite())
        }

        fn compute_function(
            &self,
            _member: &TeamMember,
            _t: f64,
            u: &[f64],
            _frozen: &[f64],
            f: &mut [f64],
            _arena: &mut TeamArena<'_>,
        ) -> Result<(), BatchError> {
            f[0] = -self.rate * u[0];
            f[1] = u[1] - 2.0 * u[0];
            Ok(())
        }
    }

    fn relaxation_descriptor(t_end: f64, dt: f64, dt_min: f64, dt_max: f64) -> TimeAdvanceDescriptor {
        TimeAdvanceDescriptor {
            t_begin: 0.0,
            t_end,
            dt,
            dt_min,
            dt_max,
            max_newton_iterations: 10,
            iterations_per_interval: 100_000,
        }
    }

    fn advance_relaxation(
        problem: &Relaxation,
        tolerances: &ToleranceTable,
        tadv: &TimeAdvanceDescriptor,
        y: &mut [f64],
        z: &mut [f64],
    ) -> StepReport {
        let extent = problem.workspace();
        let mut reals = vec![0.0; extent.reals];
        let mut ordinals = vec![0; extent.ordinals];
        let mut arena = TeamArena::new("relaxation", &mut reals, &mut ordinals);
        let integrator = TransientIntegrator::new(problem, tolerances);
        integrator
            .advance(&TeamMember::new(0, 1, 1), tadv, y, z, &mut arena)
            .unwrap()
    }

    #[test]
    fn descriptor_clamps_proposed_step() {
        let tadv = relaxation_descriptor(1.0, 1e-3, 1e-6, 0.1);
        tadv.check().unwrap();
        assert_eq!(tadv.proposed_step(0.0, 1e-9), 1e-6);
        assert_eq!(tadv.proposed_step(0.0, 5.0), 0.1);
        assert_relative_eq!(tadv.proposed_step(0.95, 0.1), 0.05, epsilon = 1e-15);

        let mut bad = tadv;
        bad.dt_min = 0.5;
        assert!(bad.check().is_err());
        let mut bad = tadv;
        bad.t_end = -1.0;
        assert!(bad.check().is_err());
        let mut bad = tadv;
        bad.iterations_per_interval = 0;
        assert!(bad.check().is_err());
    }

    #[test]
    fn weighted_norm() {
        let tol = Tolerance::new(1.0, 0.0);
        assert_relative_eq!(wrms_norm(&[1.0, 2.0], &[0.0, 0.0], |_| tol), (2.5f64).sqrt());
        let tol = Tolerance::new(0.0, 0.5);
        assert_relative_eq!(wrms_norm(&[1.0], &[4.0], |_| tol), 0.5);
        assert_eq!(wrms_norm(&[], &[], |_| tol), 0.0);
    }

    #[test]
    fn controller_shrinks_on_nan_error() {
        let controller = StepSizeController::default();
        assert_eq!(
            controller.decide(1e-3, f64::NAN, 1e-10, 1.0),
            StepDecision::Reject { next_dt: 0.25e-3 }
        );
        assert!(matches!(controller.decide(1e-3, 1e9, 1e-3, 1.0), StepDecision::Underflow { .. }));
        assert_eq!(controller.decide(0.5, 0.0, 1e-10, 1.0), StepDecision::Accept { next_dt: 1.0 });
    }

    proptest! {
        #[test]
        fn rejected_steps_always_shrink(dt in 1e-8f64..1.0, err in 1.0001f64..1e6) {
            let decision = StepSizeController::default().decide(dt, err, 1e-12, 10.0);
            match decision {
                StepDecision::Reject { next_dt } => prop_assert!(next_dt < dt),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn accepted_steps_respect_bounds(dt in 1e-8f64..1.0, err in 0.0f64..=1.0) {
            match StepSizeController::default().decide(dt, err, 1e-9, 0.5) {
                StepDecision::Accept { next_dt } => {
                    prop_assert!(next_dt <= 0.5);
                    prop_assert!(next_dt >= 1e-9);
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn sdirk_tracks_exponential_decay_and_constraint() {
        let problem = Relaxation { rate: 2.0 };
        let tolerances = ToleranceTable::uniform(1, Tolerance::new(1e-10, 1e-7), Tolerance::new(1e-12, 1e-8));
        let tadv = relaxation_descriptor(1.0, 1e-4, 1e-12, 0.1);
        let mut y = [1.0];
        let mut z = [2.0];
        let report = advance_relaxation(&problem, &tolerances, &tadv, &mut y, &mut z);
        assert!(report.failure.is_none());
        assert_eq!(report.t, 1.0);
        assert!(report.accepted_steps > 10);
        assert_relative_eq!(y[0], (-2.0f64).exp(), max_relative = 1e-4);
        assert_relative_eq!(z[0], 2.0 * y[0], max_relative = 1e-10);
    }

    #[test]
    fn stiff_decay_takes_large_steps() {
        let problem = Relaxation { rate: 1e6 };
        let tolerances = ToleranceTable::uniform(1, Tolerance::new(1e-10, 1e-6), Tolerance::new(1e-12, 1e-8));
        let tadv = relaxation_descriptor(1.0, 1e-8, 1e-14, 1.0);
        let mut y = [1.0];
        let mut z = [2.0];
        let report = advance_relaxation(&problem, &tolerances, &tadv, &mut y, &mut z);
        assert!(report.failure.is_none());
        assert_eq!(report.t, 1.0);
        assert!(report.accepted_steps + report.rejected_steps < 2000);
        assert!(y[0].abs() < 1e-8);
    }

    #[test]
    fn empty_interval_is_a_no_op() {
        let problem = Relaxation { rate: 2.0 };
        let tolerances = ToleranceTable::uniform(1, Tolerance::new(1e-10, 1e-7), Tolerance::new(1e-12, 1e-8));
        let mut tadv = relaxation_descriptor(1.0, 1e-4, 1e-12, 0.1);
        tadv.t_begin = 1.0;
        let mut y = [0.3];
        let mut z = [0.6];
        let report = advance_relaxation(&problem, &tolerances, &tadv, &mut y, &mut z);
        assert_eq!(report.t, 1.0);
        assert_eq!(report.dt, 1e-4);
        assert_eq!(report.accepted_steps + report.rejected_steps, 0);
        assert_eq!((y[0], z[0]), (0.3, 0.6));
    }

    #[test]
    fn step_below_minimum_fails_the_sample_only() {
        let problem = Relaxation { rate: 1.0 };
        let tolerances = ToleranceTable::uniform(1, Tolerance::new(1e-14, 1e-12), Tolerance::new(1e-14, 1e-12));
        let tadv = relaxation_descriptor(1.0, 0.5, 0.5, 0.5);
        let mut y = [1.0];
        let mut z = [2.0];
        let report = advance_relaxation(&problem, &tolerances, &tadv, &mut y, &mut z);
        assert_eq!(report.accepted_steps, 0);
        assert_eq!(report.rejected_steps, 1);
        assert_eq!(report.t, 0.0);
        match report.failure {
            Some(SampleFailure::StepSizeUnderflow { t, dt_min, cause, .. }) => {
                assert_eq!(t, 0.0);
                assert_eq!(dt_min, 0.5);
                assert!(matches!(cause, RejectionCause::ErrorTest { err_norm } if err_norm > 1.0));
            }
            None => panic!("expected a step size underflow"),
        }
        assert_eq!((y[0], z[0]), (1.0, 2.0));
    }

    #[test]
    fn short_final_step_rejection_shrinks_the_bounded_step() {
        let problem = Relaxation { rate: 1.0 };
        // zero weights reject every step on the error test
        let tolerances = ToleranceTable::uniform(1, Tolerance::new(0.0, 0.0), Tolerance::new(1e-12, 1e-8));
        let mut tadv = relaxation_descriptor(1e-12, 1e-6, 1e-10, 1e-6);
        tadv.iterations_per_interval = 3;
        assert_eq!(tadv.proposed_step(0.0, tadv.dt), 1e-12);

        let extent = problem.workspace();
        let mut reals = vec![0.0; extent.reals];
        let mut ordinals = vec![0; extent.ordinals];
        let member = TeamMember::new(0, 1, 1);
        for (controller, shrink) in [
            (StepSizeController::default(), 0.25f64),
            (
                StepSizeController {
                    min_factor: 0.5,
                    ..StepSizeController::default()
                },
                0.5,
            ),
        ] {
            let mut arena = TeamArena::new("short-step", &mut reals, &mut ordinals);
            let integrator = TransientIntegrator::new(&problem, &tolerances).with_controller(controller);
            let mut y = [1.0];
            let mut z = [2.0];
            let report = integrator.advance(&member, &tadv, &mut y, &mut z, &mut arena).unwrap();
            assert!(report.failure.is_none());
            assert_eq!(report.accepted_steps, 0);
            assert_eq!(report.rejected_steps, 3);
            assert_eq!(report.t, 0.0);
            assert_relative_eq!(report.dt, 1e-6 * shrink.powi(3), max_relative = 1e-12);
            assert_eq!((y[0], z[0]), (1.0, 2.0));
        }
    }

    fn newton_solve(
        solver: &NewtonConstraintSolver<'_>,
        state: &[f64],
        theta: &mut [f64],
    ) -> NewtonOutcome {
        let model = adsorption_model();
        let extent = WorkspaceSizer::size(KernelKind::InitialCondSurface, model.counts());
        let mut reals = vec![0.0; extent.reals];
        let mut ordinals = vec![0; extent.ordinals];
        let mut arena = TeamArena::new("newton", &mut reals, &mut ordinals);
        solver
            .solve(&TeamMember::new(0, 1, 2), state, theta, &mut arena)
            .unwrap()
    }

    #[test]
    fn newton_finds_adsorption_equilibrium() {
        let model = adsorption_model();
        let solver = NewtonConstraintSolver::new(&model, Tolerance::new(1e-10, 1e-6), 20);
        let state = gas_state(&model, 0.5);
        let mut theta = [1.0, 0.0];
        let outcome = newton_solve(&solver, &state, &mut theta);
        match outcome {
            NewtonOutcome::Converged { iterations, correction } => {
                assert!(iterations <= 4, "{iterations} iterations");
                assert!(correction <= 1.0);
            }
            other => panic!("not converged: {other:?}"),
        }
        let expected = equilibrium_coverage(0.5);
        assert_relative_eq!(theta[1], expected, epsilon = 1e-9);
        assert_relative_eq!(theta[0], 1.0 - expected, epsilon = 1e-9);

        // restarting from the solution converges immediately
        let again = newton_solve(&solver, &state, &mut theta);
        assert!(matches!(again, NewtonOutcome::Converged { iterations: 1, .. }));

        let mut analytic = [1.0 - expected, expected];
        let outcome = newton_solve(&solver, &state, &mut analytic);
        match outcome {
            NewtonOutcome::Converged { iterations, correction } => {
                assert_eq!(iterations, 1);
                assert!(correction < 1e-3);
            }
            other => panic!("not converged: {other:?}"),
        }
    }

    #[test]
    fn newton_failure_leaves_coverage_untouched() {
        let model = adsorption_model();
        let solver = NewtonConstraintSolver::new(&model, Tolerance::new(1e-12, 1e-8), 1);
        let state = gas_state(&model, 0.5);
        let mut theta = [1.0, 0.0];
        let outcome = newton_solve(&solver, &state, &mut theta);
        assert!(matches!(outcome, NewtonOutcome::NotConverged { iterations: 1, .. }));
        assert!(!outcome.is_converged());
        assert_eq!(theta, [1.0, 0.0]);
    }

    #[test]
    fn newton_batch_solves_every_sample() {
        let model = adsorption_model();
        let solver = NewtonConstraintSolver::new(&model, Tolerance::new(1e-10, 1e-6), 20);
        let fractions = [0.2, 0.5, 0.9];
        let rows: Vec<Vec<f64>> = fractions.iter().map(|y| gas_state(&model, *y)).collect();
        let state = BatchBuffer::from_rows("state", &rows).unwrap();
        let mut site = BatchBuffer::replicate("site_fraction", &[1.0, 0.0], 3);
        let ctx = ExecutionContext::new(ExecutionSpace::Threads(2), 2).unwrap();
        let mut dispatcher = BatchDispatcher::new();
        let outcomes = solver.run_batch(&ctx, &mut dispatcher, &state, &mut site).unwrap();
        assert!(outcomes.iter().all(|o| o.is_converged()));
        for (i, y) in fractions.iter().enumerate() {
            assert_relative_eq!(site.row(i)[1], equilibrium_coverage(*y), epsilon = 1e-9);
        }

        let mut short = BatchBuffer::replicate("site_fraction", &[1.0, 0.0], 2);
        let err = solver.run_batch(&ctx, &mut dispatcher, &state, &mut short).unwrap_err();
        assert!(matches!(err, BatchError::SampleCountMismatch { state: 3, site_fraction: 2 }));
    }
}
