use crate::Batch::errors::BatchError;
use crate::Batch::execution::TeamMember;
use crate::Batch::scratch::TeamArena;
use crate::Batch::workspace::{KernelKind, SpeciesCounts, WorkspaceExtent, WorkspaceSizer};

/// Semi-explicit DAE `du_d/dt = f(u)`, `0 = g(u)` in one packed vector `u`:
/// the first `number_of_time_odes()` unknowns are differential, the rest algebraic.
/// `compute_function` writes `f` into the differential rows and `g` into the
/// algebraic rows.
///
/// Problems borrow their constant data immutably and are shared by all teams.
pub trait TransientProblem: Sync {
    fn kind(&self) -> KernelKind;

    fn counts(&self) -> SpeciesCounts;

    fn number_of_equations(&self) -> usize {
        WorkspaceSizer::number_of_equations(self.kind(), self.counts())
    }

    fn number_of_time_odes(&self) -> usize;

    fn workspace(&self) -> WorkspaceExtent {
        WorkspaceSizer::size(self.kind(), self.counts())
    }

    /// Entry check of one sample; the message names the first violation.
    fn check_sample(&self, state: &[f64], site_fraction: &[f64]) -> Result<(), String>;

    fn pack(&self, state: &[f64], site_fraction: &[f64], u: &mut [f64]);

    /// Writes an accepted `u` back, renormalising fractions and refreshing derived fields.
    fn unpack(&self, u: &[f64], state: &mut [f64], site_fraction: &mut [f64]);

    /// Physical-domain check of a candidate solution.
    fn is_admissible(&self, u: &[f64]) -> bool;

    /// `frozen` is the sample's gas state as it was when the interval started.
    fn compute_function(
        &self,
        member: &TeamMember,
        t: f64,
        u: &[f64],
        frozen: &[f64],
        f: &mut [f64],
        arena: &mut TeamArena<'_>,
    ) -> Result<(), BatchError>;
}
