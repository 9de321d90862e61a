//! Continuously stirred tank with a catalytic surface, constant pressure and volume.
//!
//! Unknowns `u = [T, Y_1..Y_ng, theta_1..theta_ns]`. With `rho = p W / (R T)`:
//!
//! ```text
//! rho V dY_k/dt   = mdot (Yin_k - Y_k) + V w_k W_k + Acat s_k W_k - Y_k Acat sum_j s_j W_j
//! rho V cp dT/dt  = mdot (h_in - sum_k Yin_k h_k) - V sum_k h_k W_k w_k - Acat sum_k h_k W_k s_k
//! 0               = s_m / Gamma                 (m < ns - 1)
//! 0               = sum_m theta_m - 1
//! ```
//!
//! `w_k` are gas-phase and `s_k` surface production rates, `h_k` mass enthalpies.

use super::cstr_config::ReactorConfig;
use super::surface_chemistry::coverage_constraint;
use super::transient_problem::TransientProblem;
use crate::Batch::errors::BatchError;
use crate::Batch::execution::TeamMember;
use crate::Batch::scratch::TeamArena;
use crate::Batch::state_vector::{FRACTION_TOLERANCE, StateVector, check_site_fractions, normalize_fractions};
use crate::Batch::workspace::{KernelKind, SpeciesCounts};
use crate::Kinetics::kinetic_model::KineticModel;
use crate::Kinetics::reaction_rates::{GasReactionRates, SurfaceReactionRates, gas_concentrations};
use crate::Thermodynamics::R_UNIV;
use crate::Thermodynamics::property_kernels::{CpMixMass, EnthalpyMass, MolarWeights};

pub struct CstrProblem<'a> {
    model: &'a KineticModel,
    config: &'a ReactorConfig,
}

impl<'a> CstrProblem<'a> {
    pub fn new(model: &'a KineticModel, config: &'a ReactorConfig) -> Self {
        CstrProblem { model, config }
    }

    fn density(&self, member: &TeamMember, t: f64, y: &[f64]) -> f64 {
        let w = MolarWeights::team_invoke(member, y, &self.model.gas);
        self.config.pressure * w / (R_UNIV * t)
    }
}

impl TransientProblem for CstrProblem<'_> {
    fn kind(&self) -> KernelKind {
        KernelKind::TransientCstr
    }

    fn counts(&self) -> SpeciesCounts {
        self.model.counts()
    }

    fn number_of_time_odes(&self) -> usize {
        1 + self.model.gas.n_spec()
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

    fn pack(&self, state: &[f64], site_fraction: &[f64], u: &mut [f64]) {
        let ng = self.model.gas.n_spec();
        let sv = StateVector::new(ng, state);
        u[0] = sv.temperature();
        u[1..1 + ng].copy_from_slice(sv.mass_fractions());
        u[1 + ng..].copy_from_slice(site_fraction);
    }

    fn unpack(&self, u: &[f64], state: &mut [f64], site_fraction: &mut [f64]) {
        let ng = self.model.gas.n_spec();
        let mut sv = StateVector::new(ng, state);
        sv.set_temperature(u[0]);
        sv.mass_fractions_mut().copy_from_slice(&u[1..1 + ng]);
        normalize_fractions(sv.mass_fractions_mut());
        let w = 1.0
            / sv.mass_fractions()
                .iter()
                .zip(&self.model.gas.species)
                .map(|(y, sp)| y / sp.molar_mass)
                .sum::<f64>();
        sv.set_pressure(self.config.pressure);
        sv.set_density(self.config.pressure * w / (R_UNIV * u[0]));
        site_fraction.copy_from_slice(&u[1 + ng..]);
        normalize_fractions(site_fraction);
    }

    fn is_admissible(&self, u: &[f64]) -> bool {
        u.iter().all(|v| v.is_finite()) && u[0] > 0.0 && u[1..].iter().all(|v| *v >= -FRACTION_TOLERANCE)
    }

    fn compute_function(
        &self,
        member: &TeamMember,
        _t: f64,
        u: &[f64],
        _frozen: &[f64],
        f: &mut [f64],
        arena: &mut TeamArena<'_>,
    ) -> Result<(), BatchError> {
        let ng = self.model.gas.n_spec();
        let ns = self.model.surface.n_spec();
        let gas = &self.model.gas;
        let temperature = u[0];
        let y = &u[1..1 + ng];
        let theta = &u[1 + ng..];

        let conc = arena.take(ng)?;
        let omega = arena.take(ng)?;
        let s_gas = arena.take(ng)?;
        let hk = arena.take(ng)?;
        let cpks = arena.take(ng)?;
        let surf_c = arena.take(ns)?;

        let rho = self.density(member, temperature, y);
        gas_concentrations(member, rho, y, gas, conc);
        GasReactionRates::team_invoke(member, temperature, conc, omega, gas);

        let gamma = self.model.surface.site_density;
        member.team_for(ns, |m| surf_c[m] = gamma * theta[m]);
        member.team_barrier();
        let (f_gas, s_surf) = f.split_at_mut(1 + ng);
        SurfaceReactionRates::team_invoke(member, temperature, conc, surf_c, s_gas, s_surf, &self.model.surface);

        let cp = CpMixMass::team_invoke(member, temperature, y, cpks, gas);
        EnthalpyMass::team_invoke(member, temperature, y, hk, gas);
        member.team_barrier();

        let cfg = self.config;
        let rho_v = rho * cfg.volume;
        let surface_mass_flux = member.team_reduce(ng, |k| s_gas[k] * gas.species[k].molar_mass);
        member.team_for(ng, |k| {
            let wk = gas.species[k].molar_mass;
            f_gas[1 + k] = (cfg.mdot_in * (cfg.Yi[k] - y[k])
                + cfg.volume * omega[k] * wk
                + cfg.Acat * s_gas[k] * wk
                - y[k] * cfg.Acat * surface_mass_flux)
                / rho_v;
        });
        let inlet = cfg.mdot_in * (cfg.EnthalpyIn - member.team_reduce(ng, |k| cfg.Yi[k] * hk[k]));
        let gas_heat = cfg.volume * member.team_reduce(ng, |k| hk[k] * gas.species[k].molar_mass * omega[k]);
        let surface_heat = cfg.Acat * member.team_reduce(ng, |k| hk[k] * gas.species[k].molar_mass * s_gas[k]);
        f_gas[0] = (inlet - gas_heat - surface_heat) / (rho_v * cp);
        member.team_barrier();

        coverage_constraint(member, theta, gamma, s_surf);
        Ok(())
    }
}
