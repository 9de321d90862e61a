use serde::{Deserialize, Serialize};

/// Batch kernels that need team scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelKind {
    /// Constant-volume mixture specific heat.
    SpecificHeatCv,
    /// Mass-specific mixture enthalpy.
    EnthalpyMass,
    /// Newton solve of the surface constraint with the gas frozen.
    InitialCondSurface,
    /// Pseudo-transient relaxation of the site fractions.
    SimpleSurface,
    /// Coupled gas/surface stirred tank DAE.
    TransientCstr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpeciesCounts {
    pub n_gas: usize,
    pub n_surface: usize,
}

impl SpeciesCounts {
    pub fn new(n_gas: usize, n_surface: usize) -> Self {
        SpeciesCounts { n_gas, n_surface }
    }
}

/// Scratch needed by one team: reals plus ordinals (LU pivots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkspaceExtent {
    pub reals: usize,
    pub ordinals: usize,
}

/// Pure sizing rules. The same numbers size the scratch pool before launch and bound
/// what the kernels take from their arena, so a kernel never outgrows its slot.
pub struct WorkspaceSizer;

impl WorkspaceSizer {
    /// Unknowns of the kernel's nonlinear system, zero for property kernels.
    pub fn number_of_equations(kind: KernelKind, counts: SpeciesCounts) -> usize {
        match kind {
            KernelKind::SpecificHeatCv | KernelKind::EnthalpyMass => 0,
            KernelKind::InitialCondSurface | KernelKind::SimpleSurface => counts.n_surface,
            KernelKind::TransientCstr => 1 + counts.n_gas + counts.n_surface,
        }
    }

    /// Scratch for one residual evaluation.
    pub fn residual_reals(kind: KernelKind, counts: SpeciesCounts) -> usize {
        let (ng, ns) = (counts.n_gas, counts.n_surface);
        match kind {
            KernelKind::SpecificHeatCv | KernelKind::EnthalpyMass => ng,
            // gas concentrations, surface rates and surface concentrations
            KernelKind::InitialCondSurface | KernelKind::SimpleSurface => 2 * ng + ns,
            // plus gas rates, species enthalpies and heat capacities
            KernelKind::TransientCstr => 5 * ng + ns,
        }
    }

    /// Integrator vectors: u_n, stage, k1, k2, f, r, f_base, f_pert.
    pub fn integrator_reals(n: usize) -> usize {
        8 * n + n * n
    }

    /// Newton solver vectors: z, r, dz, r_pert.
    pub fn newton_reals(n: usize) -> usize {
        4 * n + n * n
    }

    pub fn size(kind: KernelKind, counts: SpeciesCounts) -> WorkspaceExtent {
        let n = Self::number_of_equations(kind, counts);
        let residual = Self::residual_reals(kind, counts);
        match kind {
            KernelKind::SpecificHeatCv | KernelKind::EnthalpyMass => WorkspaceExtent {
                reals: residual,
                ordinals: 0,
            },
            KernelKind::InitialCondSurface => WorkspaceExtent {
                reals: Self::newton_reals(n) + residual,
                ordinals: n,
            },
            KernelKind::SimpleSurface | KernelKind::TransientCstr => WorkspaceExtent {
                reals: Self::integrator_reals(n) + residual,
                ordinals: n,
            },
        }
    }
}
