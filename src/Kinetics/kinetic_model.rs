use crate::Batch::workspace::SpeciesCounts;
use crate::Thermodynamics::nasa7::Nasa7;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KineticsError {
    #[error("I/O error while reading kinetic model: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse kinetic model: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid kinetic model: {0}")]
    Invalid(String),
}

/// `k(T) = A * T^n * exp(-Ta / T)`, `Ta` being the activation temperature E/R in K.
#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arrhenius {
    pub A: f64,
    pub n: f64,
    pub Ta: f64,
}

impl Arrhenius {
    pub fn new(a: f64, n: f64, ta: f64) -> Self {
        Arrhenius { A: a, n, Ta: ta }
    }

    pub fn rate_constant(&self, t: f64) -> f64 {
        let mut k = self.A * (-self.Ta / t).exp();
        if self.n != 0.0 {
            k *= t.powf(self.n);
        }
        k
    }
}

/// `(species index, stoichiometric coefficient)`; for reactants the coefficient is also
/// the reaction order.
pub type Stoich = (usize, f64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasSpecies {
    pub name: String,
    /// kg/kmol
    pub molar_mass: f64,
    pub thermo: Nasa7,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasReaction {
    pub equation: String,
    pub reactants: Vec<Stoich>,
    pub products: Vec<Stoich>,
    pub rate: Arrhenius,
}

/// Irreversible surface reaction. Gas terms index gas species, surface terms index
/// surface species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceReaction {
    pub equation: String,
    #[serde(default)]
    pub gas_reactants: Vec<Stoich>,
    #[serde(default)]
    pub surface_reactants: Vec<Stoich>,
    #[serde(default)]
    pub gas_products: Vec<Stoich>,
    #[serde(default)]
    pub surface_products: Vec<Stoich>,
    pub rate: Arrhenius,
}

/// Gas-phase mechanism constant data, shared read-only by every team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticModelConstData {
    pub species: Vec<GasSpecies>,
    #[serde(default)]
    pub reactions: Vec<GasReaction>,
}

/// Surface mechanism constant data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticSurfModelConstData {
    pub species: Vec<String>,
    /// kmol/m^2
    pub site_density: f64,
    #[serde(default)]
    pub reactions: Vec<SurfaceReaction>,
}

/// Gas and surface mechanisms loaded together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticModel {
    pub gas: KineticModelConstData,
    pub surface: KineticSurfModelConstData,
}

impl KineticModelConstData {
    pub fn n_spec(&self) -> usize {
        self.species.len()
    }

    pub fn species_names(&self) -> Vec<String> {
        self.species.iter().map(|s| s.name.clone()).collect()
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }
}

impl KineticSurfModelConstData {
    pub fn n_spec(&self) -> usize {
        self.species.len()
    }
}

impl KineticModel {
    pub fn counts(&self) -> SpeciesCounts {
        SpeciesCounts::new(self.gas.n_spec(), self.surface.n_spec())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KineticsError> {
        let content = fs::read_to_string(path.as_ref())?;
        let model: KineticModel = serde_json::from_str(&content)?;
        model.validate()?;
        info!(
            "kinetic model loaded from {}: {} gas species, {} gas reactions, {} surface species, {} surface reactions",
            path.as_ref().display(),
            model.gas.n_spec(),
            model.gas.reactions.len(),
            model.surface.n_spec(),
            model.surface.reactions.len()
        );
        Ok(model)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), KineticsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), KineticsError> {
        let ng = self.gas.n_spec();
        let ns = self.surface.n_spec();
        if ng == 0 {
            return Err(KineticsError::Invalid("no gas species".to_string()));
        }
        for s in &self.gas.species {
            if !(s.molar_mass > 0.0) {
                return Err(KineticsError::Invalid(format!(
                    "species {} has non-positive molar mass {}",
                    s.name, s.molar_mass
                )));
            }
            if !s.thermo.is_valid() {
                return Err(KineticsError::Invalid(format!(
                    "species {} has an invalid NASA polynomial",
                    s.name
                )));
            }
        }
        if ns > 0 && !(self.surface.site_density > 0.0) {
            return Err(KineticsError::Invalid(format!(
                "site density {} is not positive",
                self.surface.site_density
            )));
        }
        let in_range = |terms: &[Stoich], n: usize| terms.iter().all(|(k, nu)| *k < n && *nu > 0.0);
        for r in &self.gas.reactions {
            if !in_range(&r.reactants, ng) || !in_range(&r.products, ng) {
                return Err(KineticsError::Invalid(format!(
                    "gas reaction {} references an unknown species",
                    r.equation
                )));
            }
        }
        for r in &self.surface.reactions {
            if !in_range(&r.gas_reactants, ng)
                || !in_range(&r.gas_products, ng)
                || !in_range(&r.surface_reactants, ns)
                || !in_range(&r.surface_products, ns)
            {
                return Err(KineticsError::Invalid(format!(
                    "surface reaction {} references an unknown species",
                    r.equation
                )));
            }
        }
        Ok(())
    }
}

fn gas_species(name: &str, molar_mass: f64, t_low: f64, t_mid: f64, t_high: f64, low: [f64; 7], high: [f64; 7]) -> GasSpecies {
    GasSpecies {
        name: name.to_string(),
        molar_mass,
        thermo: Nasa7::new(t_low, t_mid, t_high, low, high),
    }
}

/// H2/O2/H2O/N2 over platinum (PT(S), H(S), O(S)) with GRI-Mech 3.0 thermochemistry.
/// Small enough for tests, stiff enough to need the implicit integrator.
pub fn demo_mechanism() -> KineticModel {
    let species = vec![
        gas_species(
            "H2",
            2.016,
            200.0,
            1000.0,
            3500.0,
            [2.34433112E+00, 7.98052075E-03, -1.94781510E-05, 2.01572094E-08, -7.37611761E-12, -9.17935173E+02, 6.83010238E-01],
            [3.33727920E+00, -4.94024731E-05, 4.99456778E-07, -1.79566394E-10, 2.00255376E-14, -9.50158922E+02, -3.20502331E+00],
        ),
        gas_species(
            "O2",
            31.998,
            200.0,
            1000.0,
            3500.0,
            [3.78245636E+00, -2.99673416E-03, 9.84730201E-06, -9.68129509E-09, 3.24372837E-12, -1.06394356E+03, 3.65767573E+00],
            [3.28253784E+00, 1.48308754E-03, -7.57966669E-07, 2.09470555E-10, -2.16717794E-14, -1.08845772E+03, 5.45323129E+00],
        ),
        gas_species(
            "H2O",
            18.015,
            200.0,
            1000.0,
            3500.0,
            [4.19864056E+00, -2.03643410E-03, 6.52040211E-06, -5.48797062E-09, 1.77197817E-12, -3.02937267E+04, -8.49032208E-01],
            [3.03399249E+00, 2.17691804E-03, -1.64072518E-07, -9.70419870E-11, 1.68200992E-14, -3.00042971E+04, 4.96677010E+00],
        ),
        gas_species(
            "N2",
            28.014,
            300.0,
            1000.0,
            5000.0,
            [3.298677E+00, 1.4082404E-03, -3.963222E-06, 5.641515E-09, -2.444854E-12, -1.0208999E+03, 3.950372E+00],
            [2.92664E+00, 1.4879768E-03, -5.68476E-07, 1.0097038E-10, -6.753351E-15, -9.227977E+02, 5.980528E+00],
        ),
    ];
    let gas = KineticModelConstData {
        species,
        reactions: vec![GasReaction {
            equation: "2H2 + O2 => 2H2O".to_string(),
            reactants: vec![(0, 2.0), (1, 1.0)],
            products: vec![(2, 2.0)],
            rate: Arrhenius::new(1e10, 0.0, 15000.0),
        }],
    };
    let (pt, h, o) = (0, 1, 2);
    let surface = KineticSurfModelConstData {
        species: vec!["PT(S)".to_string(), "H(S)".to_string(), "O(S)".to_string()],
        site_density: 2.7e-8,
        reactions: vec![
            SurfaceReaction {
                equation: "H2 + 2PT(S) => 2H(S)".to_string(),
                gas_reactants: vec![(0, 1.0)],
                surface_reactants: vec![(pt, 2.0)],
                gas_products: vec![],
                surface_products: vec![(h, 2.0)],
                rate: Arrhenius::new(2.5e15, 0.0, 0.0),
            },
            SurfaceReaction {
                equation: "2H(S) => H2 + 2PT(S)".to_string(),
                gas_reactants: vec![],
                surface_reactants: vec![(h, 2.0)],
                gas_products: vec![(0, 1.0)],
                surface_products: vec![(pt, 2.0)],
                rate: Arrhenius::new(1e17, 0.0, 8000.0),
            },
            SurfaceReaction {
                equation: "O2 + 2PT(S) => 2O(S)".to_string(),
                gas_reactants: vec![(1, 1.0)],
                surface_reactants: vec![(pt, 2.0)],
                gas_products: vec![],
                surface_products: vec![(o, 2.0)],
                rate: Arrhenius::new(1e15, 0.0, 0.0),
            },
            SurfaceReaction {
                equation: "2H(S) + O(S) => H2O + 3PT(S)".to_string(),
                gas_reactants: vec![],
                surface_reactants: vec![(h, 2.0), (o, 1.0)],
                gas_products: vec![(2, 1.0)],
                surface_products: vec![(pt, 3.0)],
                rate: Arrhenius::new(1e24, 0.0, 5000.0),
            },
        ],
    };
    KineticModel { gas, surface }
}
