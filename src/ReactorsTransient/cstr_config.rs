use crate::Batch::batch_buffer::BatchBuffer;
use crate::Batch::dispatcher::BatchDispatcher;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::ExecutionContext;
use crate::Batch::state_vector::StateVector;
use crate::Kinetics::kinetic_model::KineticModelConstData;
use crate::Thermodynamics::property_kernels::EnthalpyMass;
use log::info;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};

/// Immutable reactor description shared read-only by all samples.
#[allow(non_snake_case)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// inlet mass flow, kg/s
    pub mdot_in: f64,
    /// m^3
    pub volume: f64,
    /// catalytic area, m^2
    pub Acat: f64,
    /// inlet mass fractions
    pub Yi: Vec<f64>,
    /// inlet (and operating) pressure, Pa
    pub pressure: f64,
    /// inlet mixture enthalpy, J/kg
    pub EnthalpyIn: f64,
}

impl ReactorConfig {
    /// Takes the inlet composition and pressure from the first sample of `state` and
    /// computes the inlet enthalpy with the `EnthalpyMass` batch kernel.
    #[allow(non_snake_case)]
    pub fn from_inlet_state(
        ctx: &ExecutionContext,
        dispatcher: &mut BatchDispatcher,
        state: &BatchBuffer,
        kmcd: &KineticModelConstData,
        mdot_in: f64,
        volume: f64,
        Acat: f64,
    ) -> Result<Self, BatchError> {
        let n_spec = kmcd.n_spec();
        if state.n_samples() == 0 {
            return Err(BatchError::ShapeMismatch {
                label: "reactor inlet state".to_string(),
                expected: 1,
                found: 0,
            });
        }
        let inlet = BatchBuffer::replicate("inlet_state", state.row(0), 1);
        let mut hk = BatchBuffer::new("inlet_enthalpy_mass", 1, n_spec);
        let mut hmix = [0.0];
        EnthalpyMass::run_batch(ctx, dispatcher, &inlet, &mut hk, &mut hmix, kmcd)?;

        let sv = StateVector::new(n_spec, inlet.row(0));
        let config = ReactorConfig {
            mdot_in,
            volume,
            Acat,
            Yi: sv.mass_fractions().to_vec(),
            pressure: sv.pressure(),
            EnthalpyIn: hmix[0],
        };
        info!(
            "reactor config: mdot_in {:e} kg/s, volume {:e} m3, Acat {:e} m2, inlet enthalpy {:e} J/kg, residence time {:e} s",
            mdot_in,
            volume,
            Acat,
            config.EnthalpyIn,
            config.residence_time(sv.density())
        );
        Ok(config)
    }

    /// `rho V / mdot_in`
    pub fn residence_time(&self, density: f64) -> f64 {
        density * self.volume / self.mdot_in
    }

    pub fn check(&self, n_gas: usize) -> Result<(), String> {
        if !(self.mdot_in >= 0.0) || !(self.volume > 0.0) || !(self.Acat >= 0.0) || !(self.pressure > 0.0) {
            return Err("flow rate, volume, catalytic area and pressure must be physical".to_string());
        }
        if self.Yi.len() != n_gas {
            return Err(format!("inlet composition has {} entries for {} species", self.Yi.len(), n_gas));
        }
        if !self.EnthalpyIn.is_finite() {
            return Err("inlet enthalpy is not finite".to_string());
        }
        Ok(())
    }

    pub fn pretty_print(&self, species: &[String]) {
        let mut table = Table::new();
        table.add_row(row!["Parameter", "Value", "Units"]);
        table.add_row(row!["Inlet mass flow", format!("{:e}", self.mdot_in), "kg/s"]);
        table.add_row(row!["Volume", format!("{:e}", self.volume), "m3"]);
        table.add_row(row!["Catalytic area", format!("{:e}", self.Acat), "m2"]);
        table.add_row(row!["Pressure", format!("{}", self.pressure), "Pa"]);
        table.add_row(row!["Inlet enthalpy", format!("{:e}", self.EnthalpyIn), "J/kg"]);
        for (name, y) in species.iter().zip(&self.Yi) {
            table.add_row(row![format!("Y_in {name}"), format!("{y}"), "-"]);
        }
        table.printstd();
    }
}
