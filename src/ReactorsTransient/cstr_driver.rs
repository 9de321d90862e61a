//! Orchestration of a complete stirred tank run:
//! batch setup, optional pseudo-transient surface relaxation, optional Newton initial
//! condition, reactor configuration, main time loop and summary.

use super::batch_time_loop::{BatchTimeLoop, LoopSummary};
use super::cstr_config::ReactorConfig;
use super::cstr_problem::CstrProblem;
use super::newton_surface::{NewtonConstraintSolver, NewtonOutcome};
use super::observers::{ProgressLogger, RoundObserver};
use super::reactor_batch::{ReactorBatch, SampleStatus};
use super::simple_surface::SimpleSurfaceProblem;
use super::snapshot::SnapshotWriter;
use super::transient_integrator::TransientIntegrator;
use super::transient_problem::TransientProblem;
use crate::Batch::batch_buffer::BatchBuffer;
use crate::Batch::dispatcher::BatchDispatcher;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::ExecutionContext;
use crate::Batch::state_vector::get_state_vector_size;
use crate::Kinetics::kinetic_model::{KineticModel, KineticModelConstData};
use crate::Thermodynamics::R_UNIV;
use crate::settings::RunSettings;
use log::info;
use prettytable::{Table, row};

/// `[density, pressure, temperature, Y..]` with the density from the ideal-gas law.
pub fn make_state_vector(
    kmcd: &KineticModelConstData,
    temperature: f64,
    pressure: f64,
    mass_fractions: &[f64],
) -> Vec<f64> {
    let inv_w: f64 = mass_fractions
        .iter()
        .zip(&kmcd.species)
        .map(|(y, sp)| y / sp.molar_mass)
        .sum();
    let mut state = Vec::with_capacity(get_state_vector_size(kmcd.n_spec()));
    state.push(pressure / (inv_w * R_UNIV * temperature));
    state.push(pressure);
    state.push(temperature);
    state.extend_from_slice(mass_fractions);
    state
}

/// A zero coverage on a multi-species surface leaves the constraint Jacobian singular.
fn has_empty_site_species(site_fraction: &BatchBuffer) -> bool {
    site_fraction.width() > 1 && site_fraction.as_slice().iter().any(|&z| z == 0.0)
}

#[derive(Debug)]
pub struct CstrOutcome {
    pub batch: ReactorBatch,
    pub config: ReactorConfig,
    pub summary: LoopSummary,
    pub surface_summary: Option<LoopSummary>,
    pub newton: Option<Vec<NewtonOutcome>>,
}

pub struct CstrSimulation<'a> {
    settings: &'a RunSettings,
    model: &'a KineticModel,
    ctx: ExecutionContext,
    dispatcher: BatchDispatcher,
}

impl<'a> CstrSimulation<'a> {
    pub fn new(settings: &'a RunSettings, model: &'a KineticModel) -> Result<Self, BatchError> {
        settings
            .validate()
            .map_err(|e| BatchError::InvalidConfiguration(e.to_string()))?;
        let ctx = ExecutionContext::new(settings.batch.execution_space(), settings.batch.team_size)?;
        Ok(Self::with_context(settings, model, ctx))
    }

    pub fn with_context(settings: &'a RunSettings, model: &'a KineticModel, ctx: ExecutionContext) -> Self {
        CstrSimulation {
            settings,
            model,
            ctx,
            dispatcher: BatchDispatcher::new(),
        }
    }

    /// Checks the sample counts and clones a single input sample `batch_size` times.
    pub fn prepare_batch(
        &self,
        state: BatchBuffer,
        site_fraction: BatchBuffer,
    ) -> Result<(BatchBuffer, BatchBuffer), BatchError> {
        if state.n_samples() != site_fraction.n_samples() {
            return Err(BatchError::SampleCountMismatch {
                state: state.n_samples(),
                site_fraction: site_fraction.n_samples(),
            });
        }
        let n_batch = self.settings.batch.batch_size;
        if state.n_samples() == 1 && n_batch > 1 {
            info!("cloning the input sample {n_batch} times");
            let state = BatchBuffer::replicate(state.label(), state.row(0), n_batch);
            let site = BatchBuffer::replicate(site_fraction.label(), site_fraction.row(0), n_batch);
            return Ok((state, site));
        }
        Ok((state, site_fraction))
    }

    pub fn run(&mut self, state: BatchBuffer, site_fraction: BatchBuffer) -> Result<CstrOutcome, BatchError> {
        let settings = self.settings;
        let model = self.model;
        let (mut state, mut site_fraction) = self.prepare_batch(state, site_fraction)?;

        let mut surface_summary = None;
        let bare = has_empty_site_species(&site_fraction);
        if bare && !settings.transient_initial_condition {
            info!("empty surface species in the input coverages, relaxing the surface first");
        }
        if settings.transient_initial_condition || bare {
            let (summary, s, z) = self.relax_surface(state, site_fraction)?;
            surface_summary = Some(summary);
            state = s;
            site_fraction = z;
        }

        let mut newton = None;
        if settings.initial_condition {
            let solver = NewtonConstraintSolver::new(
                model,
                settings.time.newton_tolerance(),
                settings.time.max_newton_iterations,
            );
            newton = Some(solver.run_batch(&self.ctx, &mut self.dispatcher, &state, &mut site_fraction)?);
        }

        let config = ReactorConfig::from_inlet_state(
            &self.ctx,
            &mut self.dispatcher,
            &state,
            &model.gas,
            settings.reactor.mdot_in,
            settings.reactor.volume,
            settings.reactor.catalytic_area,
        )?;
        config
            .check(model.gas.n_spec())
            .map_err(BatchError::InvalidConfiguration)?;

        let problem = CstrProblem::new(model, &config);
        let tolerances = settings.time.tolerances(problem.number_of_time_odes());
        tolerances
            .check(problem.number_of_time_odes())
            .map_err(BatchError::InvalidConfiguration)?;
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = ReactorBatch::new(state, site_fraction, settings.time.descriptor())?;

        let mut logger = ProgressLogger::new("TransientContSTR", settings.log_every);
        let mut snapshot = match settings.snapshot_frequency() {
            Some(k) => Some(SnapshotWriter::create(
                &settings.output_file,
                k,
                &model.gas.species_names(),
                &model.surface.species,
            )?),
            None => None,
        };
        let mut observers: Vec<&mut dyn RoundObserver> = vec![&mut logger];
        if let Some(writer) = snapshot.as_mut() {
            observers.push(writer);
        }
        let time_loop = BatchTimeLoop::new(
            "TransientContSTR",
            settings.time.t_end,
            settings.time.max_time_iterations,
        );
        let summary = time_loop.run(&self.ctx, &mut self.dispatcher, &integrator, &mut batch, &mut observers)?;

        Ok(CstrOutcome {
            batch,
            config,
            summary,
            surface_summary,
            newton,
        })
    }

    fn relax_surface(
        &mut self,
        state: BatchBuffer,
        site_fraction: BatchBuffer,
    ) -> Result<(LoopSummary, BatchBuffer, BatchBuffer), BatchError> {
        let s = &self.settings.surface_relaxation;
        let problem = SimpleSurfaceProblem::new(self.model);
        let tolerances = s.tolerances(problem.number_of_time_odes());
        let integrator = TransientIntegrator::new(&problem, &tolerances);
        let mut batch = ReactorBatch::new(state, site_fraction, s.descriptor())?;
        let mut logger = ProgressLogger::new("SimpleSurface", self.settings.log_every);
        let time_loop = BatchTimeLoop::new("SimpleSurface", s.t_end, s.max_time_iterations);
        let mut observers: [&mut dyn RoundObserver; 1] = [&mut logger];
        let summary = time_loop.run(&self.ctx, &mut self.dispatcher, &integrator, &mut batch, &mut observers)?;
        let (state, site_fraction) = batch.into_buffers();
        Ok((summary, state, site_fraction))
    }
}

impl CstrOutcome {
    pub fn pretty_print(&self, model: &KineticModel) {
        self.config.pretty_print(&model.gas.species_names());
        let mut table = Table::new();
        table.add_row(row!["Sample", "t [s]", "dt [s]", "T [K]", "Status", "Accepted", "Rejected"]);
        for i in 0..self.batch.n_samples() {
            let status = match self.batch.status[i] {
                SampleStatus::Active => "active".to_string(),
                SampleStatus::Finished => "finished".to_string(),
                SampleStatus::Failed { failure, round } => format!("failed in round {round}: {failure}"),
            };
            table.add_row(row![
                i,
                format!("{:e}", self.batch.t[i]),
                format!("{:e}", self.batch.dt[i]),
                format!("{:.3}", self.batch.state.row(i)[2]),
                status,
                self.batch.counters[i].accepted,
                self.batch.counters[i].rejected
            ]);
        }
        table.printstd();
        info!(
            "{} rounds, stop reason {:?}, {} accepted and {} rejected steps",
            self.summary.rounds, self.summary.stop_reason, self.summary.accepted_steps, self.summary.rejected_steps
        );
    }
}
