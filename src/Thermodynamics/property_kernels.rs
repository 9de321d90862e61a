//! Property kernels. `team_invoke` functions run inside a dispatched team on one
//! sample; `run_batch` functions dispatch over a whole batch of state vectors.

use super::R_UNIV;
use crate::Batch::batch_buffer::BatchBuffer;
use crate::Batch::dispatcher::BatchDispatcher;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::{ExecutionContext, TeamMember};
use crate::Batch::state_vector::StateVector;
use crate::Batch::workspace::{KernelKind, SpeciesCounts, WorkspaceSizer};
use crate::Kinetics::kinetic_model::KineticModelConstData;

/// Mixture molar mass `1 / sum(Y_k / W_k)`, kg/kmol.
pub struct MolarWeights;

impl MolarWeights {
    pub fn team_invoke(member: &TeamMember, mass_fractions: &[f64], kmcd: &KineticModelConstData) -> f64 {
        let inv = member.team_reduce(kmcd.n_spec(), |k| mass_fractions[k] / kmcd.species[k].molar_mass);
        1.0 / inv
    }
}

/// Per-species `cp_k` in J/(kg K) written to `cpks`; returns the mixture value.
pub struct CpMixMass;

impl CpMixMass {
    pub fn team_invoke(
        member: &TeamMember,
        t: f64,
        mass_fractions: &[f64],
        cpks: &mut [f64],
        kmcd: &KineticModelConstData,
    ) -> f64 {
        member.team_for(kmcd.n_spec(), |k| {
            let sp = &kmcd.species[k];
            cpks[k] = sp.thermo.cp_molar(t) / sp.molar_mass;
        });
        member.team_barrier();
        member.team_reduce(kmcd.n_spec(), |k| mass_fractions[k] * cpks[k])
    }
}

/// Per-species `h_k` in J/kg written to `hks`; returns the mixture value.
pub struct EnthalpyMass;

impl EnthalpyMass {
    pub fn team_invoke(
        member: &TeamMember,
        t: f64,
        mass_fractions: &[f64],
        hks: &mut [f64],
        kmcd: &KineticModelConstData,
    ) -> f64 {
        member.team_for(kmcd.n_spec(), |k| {
            let sp = &kmcd.species[k];
            hks[k] = sp.thermo.h_molar(t) / sp.molar_mass;
        });
        member.team_barrier();
        member.team_reduce(kmcd.n_spec(), |k| mass_fractions[k] * hks[k])
    }

    /// Per-species and mixture mass enthalpy of every sample in `state`.
    pub fn run_batch(
        ctx: &ExecutionContext,
        dispatcher: &mut BatchDispatcher,
        state: &BatchBuffer,
        enthalpy_mass: &mut BatchBuffer,
        enthalpy_mix_mass: &mut [f64],
        kmcd: &KineticModelConstData,
    ) -> Result<(), BatchError> {
        const KERNEL: &str = "EnthalpyMass";
        let n_spec = kmcd.n_spec();
        check_outputs(KERNEL, state.n_samples(), enthalpy_mix_mass.len())?;
        check_outputs(KERNEL, n_spec, enthalpy_mass.width())?;
        check_outputs(KERNEL, state.n_samples(), enthalpy_mass.n_samples())?;

        let mut samples: Vec<(&[f64], &mut [f64], &mut f64)> = state
            .rows()
            .into_iter()
            .zip(enthalpy_mass.rows_mut())
            .zip(enthalpy_mix_mass.iter_mut())
            .map(|((s, hk), h)| (s, hk, h))
            .collect();
        let extent = WorkspaceSizer::size(KernelKind::EnthalpyMass, SpeciesCounts::new(n_spec, 0));
        dispatcher.dispatch_validated(
            ctx,
            KERNEL,
            extent,
            &mut samples,
            |(s, _, _)| StateVector::new(n_spec, *s).check(),
            |member, (s, hk, h), _arena| {
                let sv = StateVector::new(n_spec, *s);
                **h = EnthalpyMass::team_invoke(member, sv.temperature(), sv.mass_fractions(), hk, kmcd);
                Ok(())
            },
        )
    }
}

/// Mixture specific heat at constant volume, `cv = cp - R / W_mix`, J/(kg K).
pub struct SpecificHeatCapacityConsVolumePerMass;

impl SpecificHeatCapacityConsVolumePerMass {
    pub fn team_invoke(
        member: &TeamMember,
        t: f64,
        mass_fractions: &[f64],
        cpks: &mut [f64],
        kmcd: &KineticModelConstData,
    ) -> f64 {
        let wmix = MolarWeights::team_invoke(member, mass_fractions, kmcd);
        let cp_mix = CpMixMass::team_invoke(member, t, mass_fractions, cpks, kmcd);
        member.team_barrier();
        cp_mix - R_UNIV / wmix
    }

    pub fn run_batch(
        ctx: &ExecutionContext,
        dispatcher: &mut BatchDispatcher,
        state: &BatchBuffer,
        cv_mix: &mut [f64],
        kmcd: &KineticModelConstData,
    ) -> Result<(), BatchError> {
        const KERNEL: &str = "SpecificHeatCapacityConsVolumePerMass";
        let n_spec = kmcd.n_spec();
        check_outputs(KERNEL, state.n_samples(), cv_mix.len())?;

        let mut samples: Vec<(&[f64], &mut f64)> = state.rows().into_iter().zip(cv_mix.iter_mut()).collect();
        let extent = WorkspaceSizer::size(KernelKind::SpecificHeatCv, SpeciesCounts::new(n_spec, 0));
        dispatcher.dispatch_validated(
            ctx,
            KERNEL,
            extent,
            &mut samples,
            |(s, _)| StateVector::new(n_spec, *s).check(),
            |member, (s, cv), arena| {
                let cpks = arena.take(n_spec)?;
                let sv = StateVector::new(n_spec, *s);
                **cv = Self::team_invoke(member, sv.temperature(), sv.mass_fractions(), cpks, kmcd);
                Ok(())
            },
        )
    }
}

fn check_outputs(kernel: &str, expected: usize, found: usize) -> Result<(), BatchError> {
    if expected != found {
        return Err(BatchError::ShapeMismatch {
            label: kernel.to_string(),
            expected,
            found,
        });
    }
    Ok(())
}
