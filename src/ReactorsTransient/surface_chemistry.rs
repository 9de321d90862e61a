use crate::Batch::errors::BatchError;
use crate::Batch::execution::TeamMember;
use crate::Batch::scratch::TeamArena;
use crate::Batch::state_vector::StateVector;
use crate::Kinetics::kinetic_model::KineticModel;
use crate::Kinetics::reaction_rates::{SurfaceReactionRates, gas_concentrations};

/// Net surface-species production `s_surf` (kmol/m^2/s) for site fractions `theta`
/// over the gas state `state`, which is held fixed. Takes `2 ng + ns` reals of scratch.
pub fn surface_rates_frozen_gas(
    member: &TeamMember,
    state: &[f64],
    theta: &[f64],
    model: &KineticModel,
    s_surf: &mut [f64],
    arena: &mut TeamArena<'_>,
) -> Result<(), BatchError> {
    let ng = model.gas.n_spec();
    let ns = model.surface.n_spec();
    let gas_c = arena.take(ng)?;
    let s_gas = arena.take(ng)?;
    let surf_c = arena.take(ns)?;

    let sv = StateVector::new(ng, state);
    gas_concentrations(member, sv.density(), sv.mass_fractions(), &model.gas, gas_c);
    let gamma = model.surface.site_density;
    member.team_for(ns, |m| surf_c[m] = gamma * theta[m]);
    member.team_barrier();
    SurfaceReactionRates::team_invoke(
        member,
        sv.temperature(),
        gas_c,
        surf_c,
        s_gas,
        s_surf,
        &model.surface,
    );
    Ok(())
}

/// Turns surface production rates into the coverage constraint in place:
/// `s_m / Gamma` for every species but the last, `sum(theta) - 1` for the last.
pub fn coverage_constraint(member: &TeamMember, theta: &[f64], site_density: f64, residual: &mut [f64]) {
    let ns = theta.len();
    if ns == 0 {
        return;
    }
    member.team_for(ns - 1, |m| residual[m] /= site_density);
    residual[ns - 1] = member.team_reduce(ns, |m| theta[m]) - 1.0;
    member.team_barrier();
}
