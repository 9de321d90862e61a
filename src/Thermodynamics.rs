//! # Thermodynamics Module
//!
//! Ideal-gas thermochemistry used by the reactor kernels.
//!
//! ## Main Structures
//!
//! - **`Nasa7`**: two-range NASA 7-coefficient polynomial (cp, h, s per species)
//! - **property kernels**: team-collaborative per-sample functions (mixture molar mass,
//!   mass-specific cp and enthalpy) and the two batch kernels built on them,
//!   `SpecificHeatCapacityConsVolumePerMass` and `EnthalpyMass`
//!
//! All quantities are SI with kmol as the amount unit: `R_UNIV` is J/(kmol·K),
//! molar masses are kg/kmol, mass-specific properties are per kg.

/// NASA 7-coefficient polynomials
pub mod nasa7;
/// team-level and batch-level thermodynamic property kernels
pub mod property_kernels;


/// Universal gas constant, J/(kmol·K)
pub const R_UNIV: f64 = 8314.462618;
