#[cfg(test)]
mod tests {
    use crate::Batch::batch_buffer::BatchBuffer;
    use crate::Batch::dispatcher::BatchDispatcher;
    use crate::Batch::errors::BatchError;
    use crate::Batch::execution::{ExecutionContext, ExecutionSpace};
    use crate::Batch::state_vector::StateVector;
    use crate::Examples::cstr_examples::{demo_inlet, simulate};
    use crate::Kinetics::kinetic_model::{KineticModel, demo_mechanism};
    use crate::ReactorsTransient::batch_time_loop::{BatchTimeLoop, StopReason};
    use crate::ReactorsTransient::cstr_config::ReactorConfig;
    use crate::ReactorsTransient::cstr_driver::{CstrSimulation, make_state_vector};
    use crate::ReactorsTransient::cstr_problem::CstrProblem;
    use crate::ReactorsTransient::fixtures::{
        P0, T0, adsorption_model, descriptor, equilibrium_coverage, gas_state, tolerances,
    };
    use crate::ReactorsTransient::observers::{ProgressLogger, RoundObserver};
    use crate::ReactorsTransient::reactor_batch::{ReactorBatch, SampleStatus};
    use crate::ReactorsTransient::simple_surface::SimpleSurfaceProblem;
    use crate::ReactorsTransient::snapshot::SnapshotWriter;
    use crate::ReactorsTransient::transient_integrator::TransientIntegrator;
    use crate::ReactorsTransient::transient_problem::TransientProblem;
    use crate::Thermodynamics::R_UNIV;
    use crate::settings::RunSettings;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    const VOLUME: f64 = 1e-4;
    const RESIDENCE_TIME: f64 = 0.1;

    /// Reactor fed with pure `A` whose residence time is `RESIDENCE_TIME`.
    fn pure_a_feed(ctx: &ExecutionContext, dispatcher: &mut BatchDispatcher, model: &KineticModel) -> ReactorConfig {
        let rho = P0 * model.gas.species[0].molar_mass / (R_UNIV * T0);
        let inlet = BatchBuffer::replicate("inlet", &gas_state(model, 1.0), 1);
        ReactorConfig::from_inlet_state(
            ctx,
            dispatcher,
            &inlet,
            &model.gas,
            rho * VOLUME / RESIDENCE_TIME,
            VOLUME,
            1e-3,
        )
        .unwrap()
    }

    fn half_a_batch(model: &KineticModel, n: usize, t_end: f64) -> ReactorBatch {
        let theta = equilibrium_coverage(0.5);
        ReactorBatch::new(
            BatchBuffer::replicate("state", &gas_state(model, 0.5), n),
            BatchBuffer::replicate("site_fraction", &[1.0 - theta, theta], n),
            descriptor(t_end, 1e-3),
        )
        .unwrap()
    }

    #[test]
    fn cstr_washes_out_towards_inlet_composition() {
        let model = adsorption_model();
        let ctx = ExecutionContext::new(ExecutionSpace::Threads(2), 2).unwrap();
        let mut dispatcher = BatchDispatcher::new();
        let config = pure_a_feed(&ctx, &mut dispatcher, &model);
        assert_relative_eq!(config.residence_time(gas_state(&model, 1.0)[0]), RESIDENCE_TIME, max_relative = 1e-12);

        let problem = CstrProblem::new(&model, &config);
        assert_eq!(problem.number_of_equations(), 5);
        let tolerances = tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = half_a_batch(&model, 3, RESIDENCE_TIME);
        let summary = BatchTimeLoop::new("washout", RESIDENCE_TIME, 1000)
            .run(&ctx, &mut dispatcher, &integrator, &mut batch, &mut [])
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::ReachedEnd);
        assert_eq!(summary.finished, 3);
        assert!(summary.failures.is_empty());
        // inert surface at equilibrium: dY_A/dt = (Yin - Y_A) / tau
        let expected = 1.0 - 0.5 * (-1.0f64).exp();
        for i in 0..3 {
            assert_eq!(batch.t[i], RESIDENCE_TIME);
            let sv = StateVector::new(2, batch.state.row(i));
            assert_relative_eq!(sv.temperature(), T0, max_relative = 1e-8);
            assert_relative_eq!(sv.mass_fractions()[0], expected, epsilon = 1e-4);
            assert_relative_eq!(sv.mass_fractions().iter().sum::<f64>(), 1.0, epsilon = 1e-12);
            let theta = batch.site_fraction.row(i);
            assert_relative_eq!(theta[1], equilibrium_coverage(sv.mass_fractions()[0]), epsilon = 1e-5);
            assert_relative_eq!(theta[0] + theta[1], 1.0, epsilon = 1e-12);
        }
        assert_eq!(batch.state.row(1), batch.state.row(0));
        assert_eq!(batch.state.row(2), batch.state.row(0));
    }

    #[test]
    fn finished_sample_idles_while_batch_continues() {
        let model = adsorption_model();
        let ctx = ExecutionContext::new(ExecutionSpace::Threads(2), 1).unwrap();
        let mut dispatcher = BatchDispatcher::new();
        let config = pure_a_feed(&ctx, &mut dispatcher, &model);
        let problem = CstrProblem::new(&model, &config);
        let tolerances = tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = half_a_batch(&model, 2, RESIDENCE_TIME);
        batch.tadv[0].t_end = 0.5 * RESIDENCE_TIME;

        let summary = BatchTimeLoop::new("early", RESIDENCE_TIME, 1000)
            .run(&ctx, &mut dispatcher, &integrator, &mut batch, &mut [])
            .unwrap();
        assert_eq!(summary.stop_reason, StopReason::ReachedEnd);
        assert_eq!(batch.status, vec![SampleStatus::Finished; 2]);
        assert_eq!(batch.t[0], 0.5 * RESIDENCE_TIME);
        assert_eq!(batch.t[1], RESIDENCE_TIME);
        assert!(batch.counters[0].accepted < batch.counters[1].accepted);
        let y_early = batch.state.row(0)[3];
        assert_relative_eq!(y_early, 1.0 - 0.5 * (-0.5f64).exp(), epsilon = 1e-4);
    }

    #[test]
    fn failed_sample_is_skipped_while_others_finish() {
        let model = adsorption_model();
        let ctx = ExecutionContext::serial();
        let mut dispatcher = BatchDispatcher::new();
        let config = pure_a_feed(&ctx, &mut dispatcher, &model);
        let problem = CstrProblem::new(&model, &config);
        let tolerances = tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = half_a_batch(&model, 2, RESIDENCE_TIME);
        let initial = batch.state.row(1).to_vec();
        // a fixed step far too coarse for the tolerances
        batch.tadv[1].dt = 0.05;
        batch.tadv[1].dt_min = 0.05;
        batch.tadv[1].dt_max = 0.05;

        let mut logger = ProgressLogger::new("failing", 1);
        let mut observers: [&mut dyn RoundObserver; 1] = [&mut logger];
        let summary = BatchTimeLoop::new("failing", RESIDENCE_TIME, 1000)
            .run(&ctx, &mut dispatcher, &integrator, &mut batch, &mut observers)
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::NoActiveSamples);
        assert_eq!(summary.finished, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, 1);
        assert_eq!(summary.failures[0].2, 0);
        assert_eq!(batch.status[0], SampleStatus::Finished);
        assert!(matches!(batch.status[1], SampleStatus::Failed { round: 0, .. }));
        assert_eq!(batch.t[0], RESIDENCE_TIME);
        assert_eq!(batch.t[1], 0.0);
        assert_eq!(batch.counters[1].accepted, 0);
        assert_eq!(batch.counters[1].rejected, 1);
        let failed = batch.state.row(1);
        assert_eq!(&failed[1..], &initial[1..]);
        assert_relative_eq!(failed[0], initial[0], max_relative = 1e-12);
    }

    #[test]
    fn invalid_state_aborts_before_any_step() {
        let model = adsorption_model();
        let ctx = ExecutionContext::new(ExecutionSpace::Threads(0), 1).unwrap();
        let mut dispatcher = BatchDispatcher::new();
        let config = pure_a_feed(&ctx, &mut dispatcher, &model);
        let problem = CstrProblem::new(&model, &config);
        let tolerances = tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = half_a_batch(&model, 3, RESIDENCE_TIME);
        let bad = make_state_vector(&model.gas, T0, P0, &[1.0, 1.0]);
        batch.state.row_mut(2).copy_from_slice(&bad);
        let before = batch.clone();

        let err = BatchTimeLoop::new("invalid", RESIDENCE_TIME, 10)
            .run(&ctx, &mut dispatcher, &integrator, &mut batch, &mut [])
            .unwrap_err();
        match err {
            BatchError::InvalidState { sample, reason, .. } => {
                assert_eq!(sample, 2);
                assert!(reason.contains("sum to 2"), "{reason}");
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(batch.state.as_slice(), before.state.as_slice());
        assert_eq!(batch.site_fraction.as_slice(), before.site_fraction.as_slice());
        assert_eq!(batch.t, before.t);
        assert_eq!(batch.counters, before.counters);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let model = adsorption_model();
        let err = ReactorBatch::new(
            BatchBuffer::replicate("state", &gas_state(&model, 0.5), 2),
            BatchBuffer::replicate("site_fraction", &[1.0, 0.0], 3),
            descriptor(1.0, 1e-3),
        )
        .unwrap_err();
        assert!(matches!(err, BatchError::SampleCountMismatch { state: 2, site_fraction: 3 }));
    }

    #[test]
    fn snapshot_rows_follow_frequency() {
        let model = adsorption_model();
        let ctx = ExecutionContext::serial();
        let mut dispatcher = BatchDispatcher::new();
        let config = pure_a_feed(&ctx, &mut dispatcher, &model);
        let problem = CstrProblem::new(&model, &config);
        let tolerances = tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = half_a_batch(&model, 2, 0.01);

        let mut writer = SnapshotWriter::new(
            Vec::new(),
            3,
            &model.gas.species_names(),
            &model.surface.species,
        )
        .unwrap();
        let summary = {
            let mut observers: [&mut dyn RoundObserver; 1] = [&mut writer];
            BatchTimeLoop::new("snapshot", 0.01, 1000)
                .run(&ctx, &mut dispatcher, &integrator, &mut batch, &mut observers)
                .unwrap()
        };
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "iter t dt Density[kg/m3] Pressure[Pascal] Temperature[K] A B PT(S) A(S)"
        );
        assert!(lines[1].starts_with("-1 0e0 1e-6 "), "{}", lines[1]);
        assert!(lines[3].starts_with("0 "), "{}", lines[3]);
        let recorded = summary.rounds.div_ceil(3);
        assert_eq!(lines.len(), 1 + 2 * (1 + recorded));
        assert!(lines[1..].iter().all(|l| l.split_whitespace().count() == 10));
    }

    #[test]
    fn surface_relaxation_reaches_equilibrium() {
        let model = adsorption_model();
        let ctx = ExecutionContext::serial();
        let mut dispatcher = BatchDispatcher::new();
        let problem = SimpleSurfaceProblem::new(&model);
        assert_eq!(problem.number_of_equations(), 2);
        let tolerances = tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = ReactorBatch::new(
            BatchBuffer::replicate("state", &gas_state(&model, 0.5), 1),
            BatchBuffer::replicate("site_fraction", &[1.0, 0.0], 1),
            descriptor(1.0, 1e-2),
        )
        .unwrap();
        let gas_before = batch.state.as_slice().to_vec();

        let summary = BatchTimeLoop::new("relaxation", 1.0, 1000)
            .run(&ctx, &mut dispatcher, &integrator, &mut batch, &mut [])
            .unwrap();
        assert_eq!(summary.stop_reason, StopReason::ReachedEnd);
        let theta = batch.site_fraction.row(0);
        assert_relative_eq!(theta[1], equilibrium_coverage(0.5), epsilon = 1e-5);
        assert_relative_eq!(theta[0] + theta[1], 1.0, epsilon = 1e-12);
        assert_eq!(batch.state.as_slice(), &gas_before[..]);
    }

    #[test]
    fn identical_samples_give_identical_results() {
        let model = demo_mechanism();
        let dir = tempdir().unwrap();
        let output = dir.path().join("trajectory.dat");
        let mut settings = RunSettings::default();
        settings.batch.batch_size = 4;
        settings.batch.team_size = 2;
        settings.batch.threads = Some(2);
        settings.transient_initial_condition = true;
        settings.output_frequency = 100;
        settings.output_file = output.to_string_lossy().into_owned();

        let state = make_state_vector(&model.gas, 700.0, 101325.0, &[0.02, 0.2, 0.0, 0.78]);
        let mut simulation = CstrSimulation::new(&settings, &model).unwrap();
        let outcome = simulation
            .run(
                BatchBuffer::replicate("state", &state, 1),
                BatchBuffer::replicate("site_fraction", &[1.0, 0.0, 0.0], 1),
            )
            .unwrap();

        let batch = &outcome.batch;
        assert_eq!(batch.n_samples(), 4);
        assert_eq!(settings.time.t_end, 0.025);
        assert_eq!((settings.time.dt_min, settings.time.dt_max), (1e-10, 1e-6));
        assert_eq!(outcome.summary.stop_reason, StopReason::ReachedEnd);
        assert!(outcome.summary.failures.is_empty());
        assert!(outcome.summary.rounds <= 4000);
        assert!(outcome.surface_summary.is_some());
        let newton = outcome.newton.as_ref().unwrap();
        assert_eq!(newton.len(), 4);
        assert!(newton.iter().all(|o| o.is_converged()));
        assert_eq!(batch.status, vec![SampleStatus::Finished; 4]);
        assert_eq!(batch.t[0], 0.025);
        assert!(batch.counters[0].accepted > 0);
        for i in 1..4 {
            assert_eq!(batch.state.row(i), batch.state.row(0));
            assert_eq!(batch.site_fraction.row(i), batch.site_fraction.row(0));
            assert_eq!(batch.t[i], batch.t[0]);
            assert_eq!(batch.counters[i], batch.counters[0]);
        }
        let sv = StateVector::new(4, batch.state.row(0));
        assert!(sv.temperature().is_finite() && sv.temperature() > 0.0);
        assert_relative_eq!(sv.mass_fractions().iter().sum::<f64>(), 1.0, epsilon = 1e-12);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("H2 O2 H2O N2 PT(S) H(S) O(S)"));
        assert_eq!(lines.len(), 1 + 4 * (1 + outcome.summary.rounds.div_ceil(100)));
    }

    #[test]
    fn default_demo_run_reaches_end_time() {
        let model = demo_mechanism();
        let mut settings = RunSettings::default();
        settings.batch.threads = None;
        assert!(!settings.transient_initial_condition);
        let (_, theta) = demo_inlet(&model);
        assert_eq!(theta, vec![1.0, 0.0, 0.0]);

        let outcome = simulate(&settings, &model).unwrap();
        // the bare input surface is relaxed before the Newton solve
        assert!(outcome.surface_summary.is_some());
        let newton = outcome.newton.as_ref().unwrap();
        assert!(newton[0].is_converged());
        assert_eq!(outcome.summary.stop_reason, StopReason::ReachedEnd);
        assert!(outcome.summary.failures.is_empty());
        assert_eq!(outcome.batch.n_samples(), 1);
        assert_eq!(outcome.batch.t[0], settings.time.t_end);
        let theta = outcome.batch.site_fraction.row(0);
        assert!(theta.iter().all(|z| *z > 0.0));
        assert_relative_eq!(theta.iter().sum::<f64>(), 1.0, epsilon = 1e-8);
    }

    #[test]
    fn simulation_rejects_mismatched_input() {
        let model = demo_mechanism();
        let settings = RunSettings::default();
        let simulation = CstrSimulation::new(&settings, &model).unwrap();
        let state = make_state_vector(&model.gas, 700.0, 101325.0, &[0.02, 0.2, 0.0, 0.78]);
        let err = simulation
            .prepare_batch(
                BatchBuffer::replicate("state", &state, 2),
                BatchBuffer::replicate("site_fraction", &[1.0, 0.0, 0.0], 1),
            )
            .unwrap_err();
        assert!(matches!(err, BatchError::SampleCountMismatch { state: 2, site_fraction: 1 }));
    }
}
