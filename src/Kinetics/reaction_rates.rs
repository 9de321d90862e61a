use super::kinetic_model::{KineticModelConstData, KineticSurfModelConstData, Stoich};
use crate::Batch::execution::TeamMember;

fn concentration_power(c: f64, nu: f64) -> f64 {
    if nu == 1.0 {
        c
    } else if nu.fract() == 0.0 {
        c.powi(nu as i32)
    } else {
        c.max(0.0).powf(nu)
    }
}

fn mass_action(terms: &[Stoich], concentrations: &[f64]) -> f64 {
    terms
        .iter()
        .map(|(k, nu)| concentration_power(concentrations[*k], *nu))
        .product()
}

/// `C_k = rho * Y_k / W_k`, kmol/m^3.
pub fn gas_concentrations(
    member: &TeamMember,
    density: f64,
    mass_fractions: &[f64],
    kmcd: &KineticModelConstData,
    concentrations: &mut [f64],
) {
    member.team_for(kmcd.n_spec(), |k| {
        concentrations[k] = density * mass_fractions[k] / kmcd.species[k].molar_mass;
    });
    member.team_barrier();
}

/// Net molar production rates of the gas species, kmol/(m^3 s).
pub struct GasReactionRates;

impl GasReactionRates {
    pub fn team_invoke(
        member: &TeamMember,
        t: f64,
        concentrations: &[f64],
        omega: &mut [f64],
        kmcd: &KineticModelConstData,
    ) {
        member.team_for(omega.len(), |k| omega[k] = 0.0);
        member.team_barrier();
        for r in &kmcd.reactions {
            let q = r.rate.rate_constant(t) * mass_action(&r.reactants, concentrations);
            for (k, nu) in &r.reactants {
                omega[*k] -= nu * q;
            }
            for (k, nu) in &r.products {
                omega[*k] += nu * q;
            }
        }
        member.team_barrier();
    }
}

/// Net molar production rates from surface reactions, kmol/(m^2 s), for the gas
/// species (`s_gas`) and the surface species (`s_surf`). Surface concentrations are
/// `site_density * theta`.
pub struct SurfaceReactionRates;

impl SurfaceReactionRates {
    pub fn team_invoke(
        member: &TeamMember,
        t: f64,
        gas_concentrations: &[f64],
        surface_concentrations: &[f64],
        s_gas: &mut [f64],
        s_surf: &mut [f64],
        ksmcd: &KineticSurfModelConstData,
    ) {
        member.team_for(s_gas.len(), |k| s_gas[k] = 0.0);
        member.team_for(s_surf.len(), |k| s_surf[k] = 0.0);
        member.team_barrier();
        for r in &ksmcd.reactions {
            let q = r.rate.rate_constant(t)
                * mass_action(&r.gas_reactants, gas_concentrations)
                * mass_action(&r.surface_reactants, surface_concentrations);
            for (k, nu) in &r.gas_reactants {
                s_gas[*k] -= nu * q;
            }
            for (k, nu) in &r.gas_products {
                s_gas[*k] += nu * q;
            }
            for (m, nu) in &r.surface_reactants {
                s_surf[*m] -= nu * q;
            }
            for (m, nu) in &r.surface_products {
                s_surf[*m] += nu * q;
            }
        }
        member.team_barrier();
    }
}
