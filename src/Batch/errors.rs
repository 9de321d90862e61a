use std::fmt;
use thiserror::Error;

/// Structural failures of a batch call. Any of these aborts the whole invocation.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{kernel}: input state vector of sample {sample} is not valid: {reason}")]
    InvalidState {
        kernel: &'static str,
        sample: usize,
        reason: String,
    },
    #[error(
        "sample count mismatch: state buffer has {state} samples, site fraction buffer has {site_fraction}"
    )]
    SampleCountMismatch { state: usize, site_fraction: usize },
    #[error("{label}: scratch exhausted, requested {requested} entries but only {available} remain")]
    ScratchExhausted {
        label: &'static str,
        requested: usize,
        available: usize,
    },
    #[error("{label}: shape mismatch, expected {expected} but found {found}")]
    ShapeMismatch {
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build execution space: {0}")]
    ExecutionSetup(#[from] rayon::ThreadPoolBuildError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the last attempted sub-step was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectionCause {
    /// Local error estimate above tolerance (weighted RMS norm, > 1).
    ErrorTest { err_norm: f64 },
    /// The stage Newton iteration did not converge.
    NewtonDivergence { iterations: usize },
    /// The candidate state left the physical domain.
    Inadmissible,
}

impl fmt::Display for RejectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionCause::ErrorTest { err_norm } => {
                write!(f, "error test failed with norm {err_norm:.3e}")
            }
            RejectionCause::NewtonDivergence { iterations } => {
                write!(f, "stage Newton iteration diverged after {iterations} iterations")
            }
            RejectionCause::Inadmissible => write!(f, "candidate state is not admissible"),
        }
    }
}

/// Numerical failure confined to one sample. Recorded per sample, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SampleFailure {
    #[error("step size underflow at t = {t:.6e}: dt = {dt:.3e} below dt_min = {dt_min:.3e} ({cause})")]
    StepSizeUnderflow {
        t: f64,
        dt: f64,
        dt_min: f64,
        cause: RejectionCause,
    },
}
