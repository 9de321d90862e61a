use crate::Batch::batch_buffer::BatchBuffer;
use crate::Batch::dispatcher::BatchDispatcher;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::ExecutionContext;
use crate::Kinetics::kinetic_model::{KineticModel, demo_mechanism};
use crate::ReactorsTransient::cstr_driver::{CstrOutcome, CstrSimulation, make_state_vector};
use crate::Thermodynamics::property_kernels::SpecificHeatCapacityConsVolumePerMass;
use crate::settings::RunSettings;
use log::{error, info};
use std::error::Error;

fn load_model(settings: &RunSettings) -> Result<KineticModel, Box<dyn Error>> {
    match &settings.mechanism_file {
        Some(path) => Ok(KineticModel::from_file(path)?),
        None => {
            info!("no mechanism file given, using the built-in H2/O2 on Pt mechanism");
            Ok(demo_mechanism())
        }
    }
}

/// Lean hydrogen in air at 700 K over a bare platinum surface.
pub fn demo_inlet(model: &KineticModel) -> (Vec<f64>, Vec<f64>) {
    let ng = model.gas.n_spec();
    let mut y = vec![0.0; ng];
    let named = [("H2", 0.02), ("O2", 0.2), ("N2", 0.78)];
    for (name, value) in named {
        if let Some(k) = model.gas.species_index(name) {
            y[k] = value;
        }
    }
    if y.iter().sum::<f64>() == 0.0 {
        y[ng - 1] = 1.0;
    }
    let state = make_state_vector(&model.gas, 700.0, 101325.0, &y);
    let mut theta = vec![0.0; model.surface.n_spec()];
    if let Some(first) = theta.first_mut() {
        *first = 1.0;
    }
    (state, theta)
}

/// Runs the demo inlet cloned `batch_size` times.
pub fn simulate(settings: &RunSettings, model: &KineticModel) -> Result<CstrOutcome, BatchError> {
    let (state, theta) = demo_inlet(model);
    let mut simulation = CstrSimulation::new(settings, model)?;
    simulation.run(
        BatchBuffer::replicate("state", &state, 1),
        BatchBuffer::replicate("site_fraction", &theta, 1),
    )
}

/// Hydrogen oxidation over platinum in a stirred tank.
pub fn cstr_example(settings: &RunSettings) -> Result<(), Box<dyn Error>> {
    let model = load_model(settings)?;
    let outcome = simulate(settings, &model)?;
    outcome.pretty_print(&model);
    for (sample, failure, round) in &outcome.summary.failures {
        error!("sample {sample} failed in round {round}: {failure}");
    }

    let ctx = ExecutionContext::serial();
    let mut dispatcher = BatchDispatcher::new();
    let mut cv = vec![0.0; outcome.batch.n_samples()];
    SpecificHeatCapacityConsVolumePerMass::run_batch(&ctx, &mut dispatcher, &outcome.batch.state, &mut cv, &model.gas)?;
    for (i, cv) in cv.iter().enumerate() {
        info!("sample {i}: final cv = {cv:.3} J/(kg K)");
    }
    Ok(())
}

pub fn cstr_examples(task: usize, settings: &RunSettings) {
    let result = match task {
        0 => cstr_example(settings),
        1 => {
            // pseudo-transient start from a bare surface, trajectory written every 10 rounds
            let mut settings = settings.clone();
            settings.transient_initial_condition = true;
            settings.output_frequency = 10;
            settings.batch.batch_size = 4;
            cstr_example(&settings)
        }
        _ => {
            error!("unknown example {task}");
            Ok(())
        }
    };
    if let Err(e) = result {
        error!("example {task} failed: {e}");
    }
}
