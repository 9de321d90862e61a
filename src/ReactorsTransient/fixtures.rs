//! Small mechanisms with closed-form answers, shared by the reactor tests.

use super::cstr_driver::make_state_vector;
use super::time_advance::{TimeAdvanceDescriptor, Tolerance, ToleranceTable};
use crate::Kinetics::kinetic_model::{
    Arrhenius, GasSpecies, KineticModel, KineticModelConstData, KineticSurfModelConstData, SurfaceReaction,
    demo_mechanism,
};
use crate::Thermodynamics::R_UNIV;

pub const T0: f64 = 500.0;
pub const P0: f64 = 101325.0;
pub const K_ADS: f64 = 1e3;
pub const K_DES: f64 = 10.0;

/// Gas `A` and inert `B` sharing the N2 thermochemistry and molar mass, over a surface
/// with `A + PT(S) <=> A(S)` written as two irreversible steps.
pub fn adsorption_model() -> KineticModel {
    let nitrogen = demo_mechanism().gas.species[3].clone();
    let species = vec![
        GasSpecies {
            name: "A".to_string(),
            ..nitrogen.clone()
        },
        GasSpecies {
            name: "B".to_string(),
            ..nitrogen
        },
    ];
    let surface = KineticSurfModelConstData {
        species: vec!["PT(S)".to_string(), "A(S)".to_string()],
        site_density: 2.7e-8,
        reactions: vec![
            SurfaceReaction {
                equation: "A + PT(S) => A(S)".to_string(),
                gas_reactants: vec![(0, 1.0)],
                surface_reactants: vec![(0, 1.0)],
                gas_products: vec![],
                surface_products: vec![(1, 1.0)],
                rate: Arrhenius::new(K_ADS, 0.0, 0.0),
            },
            SurfaceReaction {
                equation: "A(S) => A + PT(S)".to_string(),
                gas_reactants: vec![],
                surface_reactants: vec![(1, 1.0)],
                gas_products: vec![(0, 1.0)],
                surface_products: vec![(0, 1.0)],
                rate: Arrhenius::new(K_DES, 0.0, 0.0),
            },
        ],
    };
    KineticModel {
        gas: KineticModelConstData {
            species,
            reactions: vec![],
        },
        surface,
    }
}

/// Equilibrium `theta_A = K / (1 + K)` with `K = k_ads C_A / k_des`.
pub fn equilibrium_coverage(y_a: f64) -> f64 {
    let c_a = P0 * y_a / (R_UNIV * T0);
    let k = K_ADS * c_a / K_DES;
    k / (1.0 + k)
}

pub fn gas_state(model: &KineticModel, y_a: f64) -> Vec<f64> {
    make_state_vector(&model.gas, T0, P0, &[y_a, 1.0 - y_a])
}

pub fn descriptor(t_end: f64, dt_max: f64) -> TimeAdvanceDescriptor {
    TimeAdvanceDescriptor {
        t_begin: 0.0,
        t_end,
        dt: 1e-6,
        dt_min: 1e-14,
        dt_max,
        max_newton_iterations: 20,
        iterations_per_interval: 10,
    }
}

pub fn tolerances(n_time_odes: usize) -> ToleranceTable {
    ToleranceTable::uniform(n_time_odes, Tolerance::new(1e-10, 1e-6), Tolerance::new(1e-12, 1e-8))
}
