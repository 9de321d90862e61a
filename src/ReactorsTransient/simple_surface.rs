use super::surface_chemistry::surface_rates_frozen_gas;
use super::transient_problem::TransientProblem;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::TeamMember;
use crate::Batch::scratch::TeamArena;
use crate::Batch::state_vector::{FRACTION_TOLERANCE, StateVector, check_site_fractions, normalize_fractions};
use crate::Batch::workspace::{KernelKind, SpeciesCounts};
use crate::Kinetics::kinetic_model::KineticModel;

/// Pseudo-transient relaxation of the site fractions, `d theta_m / dt = s_m / Gamma`,
/// with the gas state frozen. Drives a bare surface towards a coverage from which
/// the Newton constraint solve converges.
pub struct SimpleSurfaceProblem<'a> {
    model: &'a KineticModel,
}

impl<'a> SimpleSurfaceProblem<'a> {
    pub fn new(model: &'a KineticModel) -> Self {
        SimpleSurfaceProblem { model }
    }
}

impl TransientProblem for SimpleSurfaceProblem<'_> {
    fn kind(&self) -> KernelKind {
        KernelKind::SimpleSurface
    }

    fn counts(&self) -> SpeciesCounts {
        self.model.counts()
    }

    fn number_of_time_odes(&self) -> usize {
        self.model.surface.n_spec()
    }

    fn check_sample(&self, state: &[f64], site_fraction: &[f64]) -> Result<(), String> {
        StateVector::new(self.model.gas.n_spec(), state).check()?;
        if site_fraction.len() != self.model.surface.n_spec() {
            return Err(format!(
                "{} site fractions for {} surface species",
                site_fraction.len(),
                self.model.surface.n_spec()
            ));
        }
        check_site_fractions(site_fraction)
    }

    fn pack(&self, _state: &[f64], site_fraction: &[f64], u: &mut [f64]) {
        u.copy_from_slice(site_fraction);
    }

    fn unpack(&self, u: &[f64], _state: &mut [f64], site_fraction: &mut [f64]) {
        site_fraction.copy_from_slice(u);
        normalize_fractions(site_fraction);
    }

    fn is_admissible(&self, u: &[f64]) -> bool {
        u.iter().all(|v| v.is_finite() && *v >= -FRACTION_TOLERANCE)
    }

    fn compute_function(
        &self,
        member: &TeamMember,
        _t: f64,
        u: &[f64],
        frozen: &[f64],
        f: &mut [f64],
        arena: &mut TeamArena<'_>,
    ) -> Result<(), BatchError> {
        surface_rates_frozen_gas(member, frozen, u, self.model, f, arena)?;
        let gamma = self.model.surface.site_density;
        member.team_for(f.len(), |m| f[m] /= gamma);
        member.team_barrier();
        Ok(())
    }
}
