//! # Transient Reactor Module
//!
//! Batched time integration of a continuously stirred tank reactor with a catalytic
//! surface. Every sample of the batch is an independent reactor advanced by its own
//! team; the host loop only synchronises them at round boundaries.
//!
//! ## Mathematical Model
//!
//! ### Nomenclature
//!
//! | Symbol | Description | Units |
//! |--------|-------------|-------|
//! | `T` | Temperature | K |
//! | `Y_k` | Gas mass fraction | - |
//! | `θ_m` | Surface site fraction | - |
//! | `ṁ` | Inlet mass flow | kg/s |
//! | `V` | Reactor volume | m³ |
//! | `Acat` | Catalytic area | m² |
//! | `Γ` | Surface site density | kmol/m² |
//!
//! The unknowns `u = [T, Y, θ]` form a semi-explicit index-1 DAE: temperature and mass
//! fractions are differential, the site fractions are fixed by the quasi-steady surface
//! balance `s_m = 0` plus the closure `Σθ = 1` (see [`cstr_problem`]).
//!
//! ## Numerical Solution
//!
//! Each round of the [`batch_time_loop::BatchTimeLoop`] lets every active sample take up
//! to `iterations_per_interval` adaptive steps of a two-stage L-stable SDIRK method
//! ([`transient_integrator`]). The algebraic rows are imposed exactly in every stage by
//! simplified Newton on a scratch-backed LU-factored iteration matrix. After the round
//! the host averages the sample times, reseeds each sample's descriptor and calls the
//! round observers (progress logging, trajectory snapshots).
//!
//! Consistent initial site fractions come from [`newton_surface`] (Newton on the surface
//! constraint at frozen gas state), optionally preceded by a pseudo-transient relaxation
//! of the coverages ([`simple_surface`]).
//!
//! ## Failure model
//!
//! | Failure | Scope | Effect |
//! |---------|-------|--------|
//! | invalid input state, buffer mismatch | whole call | `BatchError`, nothing written |
//! | step size below `dt_min` | one sample | sample marked failed, others continue |
//! | Newton not converged at the initial condition | one sample | reported in the outcome |

/// Adaptive step descriptor, tolerances, weighted norm and step-size controller.
pub mod time_advance;
/// The DAE interface shared by all transient kernels.
pub mod transient_problem;
/// Surface production rates at frozen gas state and the coverage constraint.
pub mod surface_chemistry;
pub mod cstr_config;
pub mod cstr_problem;
pub mod simple_surface;
/// SDIRK2 integrator for one sample over one round.
pub mod transient_integrator;
pub mod newton_surface;
pub mod reactor_batch;
pub mod batch_time_loop;
pub mod observers;
/// Trajectory file written as a round observer.
pub mod snapshot;
/// Full CSTR run: batch preparation, initial conditions, main loop, summary.
pub mod cstr_driver;

#[cfg(test)]
mod fixtures;
mod integrator_tests;
mod time_loop_tests;
