/// Constant data of a gas mechanism and of a surface mechanism: species, molar masses,
/// NASA polynomials, elementary Arrhenius reactions. Loaded from JSON or taken from the
/// built-in H2/O2 on platinum demonstration mechanism.
pub mod kinetic_model;
/// Team-level net production rates of gas and surface species.
pub mod reaction_rates;
