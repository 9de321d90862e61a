//! # Settings Module
//!
//! ## Purpose
//! Run configuration of a stirred tank simulation, persisted as JSON. Every field has a
//! default, so a settings file only needs the values that differ.
//!
//! ## Configuration Format
//! ```json
//! {
//!   "reactor": { "mdot_in": 3.596978981250784e-6, "volume": 1.347e-4, "catalytic_area": 1.3074e-3 },
//!   "time": { "t_end": 0.025, "dt_max": 1e-6, "max_time_iterations": 4000 },
//!   "batch": { "batch_size": 4, "threads": 0 },
//!   "output_frequency": 10,
//!   "transient_initial_condition": true
//! }
//! ```
//!
//! ## Sections
//! | Section | Contents |
//! |---------|----------|
//! | `reactor` | inlet mass flow, volume, catalytic area |
//! | `time` | stepping bounds, tolerances, iteration budgets of the main loop |
//! | `surface_relaxation` | the same for the pseudo-transient surface phase |
//! | `batch` | number of samples and execution space |
//! | top level | output frequency and file, initial-condition switches, mechanism file |

use crate::Batch::execution::ExecutionSpace;
use crate::ReactorsTransient::time_advance::{Tolerance, TimeAdvanceDescriptor, ToleranceTable};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error while accessing settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorSettings {
    /// kg/s
    pub mdot_in: f64,
    /// m^3
    pub volume: f64,
    /// m^2
    pub catalytic_area: f64,
}

impl Default for ReactorSettings {
    fn default() -> Self {
        ReactorSettings {
            mdot_in: 3.596978981250784e-06,
            volume: 0.00013470,
            catalytic_area: 0.0013074,
        }
    }
}

/// Stepping bounds, tolerances and budgets of one time loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeSettings {
    pub t_begin: f64,
    pub t_end: f64,
    pub dt: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub atol_time: f64,
    pub rtol_time: f64,
    pub atol_newton: f64,
    pub rtol_newton: f64,
    pub iterations_per_interval: usize,
    pub max_time_iterations: usize,
    pub max_newton_iterations: usize,
}

impl Default for TimeSettings {
    fn default() -> Self {
        TimeSettings {
            t_begin: 0.0,
            t_end: 0.025,
            dt: 1e-10,
            dt_min: 1e-10,
            dt_max: 1e-6,
            atol_time: 1e-12,
            rtol_time: 1e-4,
            atol_newton: 1e-12,
            rtol_newton: 1e-6,
            iterations_per_interval: 10,
            max_time_iterations: 4000,
            max_newton_iterations: 100,
        }
    }
}

impl TimeSettings {
    /// Settings of the pseudo-transient surface relaxation.
    pub fn surface_relaxation() -> Self {
        TimeSettings {
            t_begin: 0.0,
            t_end: 1.0,
            dt: 1e-20,
            dt_min: 1e-20,
            dt_max: 1e-3,
            atol_time: 1e-12,
            rtol_time: 1e-8,
            atol_newton: 1e-14,
            rtol_newton: 1e-8,
            iterations_per_interval: 10,
            max_time_iterations: 1000,
            max_newton_iterations: 20,
        }
    }

    pub fn descriptor(&self) -> TimeAdvanceDescriptor {
        TimeAdvanceDescriptor {
            t_begin: self.t_begin,
            t_end: self.t_end,
            dt: self.dt,
            dt_min: self.dt_min,
            dt_max: self.dt_max,
            max_newton_iterations: self.max_newton_iterations,
            iterations_per_interval: self.iterations_per_interval,
        }
    }

    pub fn tolerances(&self, n_time_odes: usize) -> ToleranceTable {
        ToleranceTable::uniform(
            n_time_odes,
            Tolerance::new(self.atol_time, self.rtol_time),
            Tolerance::new(self.atol_newton, self.rtol_newton),
        )
    }

    pub fn newton_tolerance(&self) -> Tolerance {
        Tolerance::new(self.atol_newton, self.rtol_newton)
    }

    fn check(&self, section: &str) -> Result<(), SettingsError> {
        self.descriptor()
            .check()
            .map_err(|e| SettingsError::Invalid(format!("{section}: {e}")))?;
        if self.max_time_iterations == 0 {
            return Err(SettingsError::Invalid(format!("{section}: max_time_iterations must be at least 1")));
        }
        self.tolerances(1)
            .check(1)
            .map_err(|e| SettingsError::Invalid(format!("{section}: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Copies of the input sample when the input holds a single sample.
    pub batch_size: usize,
    pub team_size: usize,
    /// `None` runs serially, `Some(0)` lets the pool pick the thread count.
    pub threads: Option<usize>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            batch_size: 1,
            team_size: 1,
            threads: Some(0),
        }
    }
}

impl BatchSettings {
    pub fn execution_space(&self) -> ExecutionSpace {
        match self.threads {
            None => ExecutionSpace::Serial,
            Some(n) => ExecutionSpace::Threads(n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub reactor: ReactorSettings,
    pub time: TimeSettings,
    pub surface_relaxation: TimeSettings,
    pub batch: BatchSettings,
    /// Snapshot every k-th round; `k <= 0` disables the trajectory file.
    pub output_frequency: i64,
    pub output_file: String,
    /// Relax the site fractions pseudo-transiently before the Newton solve.
    pub transient_initial_condition: bool,
    /// Solve the surface constraint by Newton before the main loop.
    pub initial_condition: bool,
    /// JSON mechanism; the built-in demonstration mechanism when absent.
    pub mechanism_file: Option<String>,
    /// Log progress every this many rounds.
    pub log_every: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            reactor: ReactorSettings::default(),
            time: TimeSettings::default(),
            surface_relaxation: TimeSettings::surface_relaxation(),
            batch: BatchSettings::default(),
            output_frequency: -1,
            output_file: "CSTRSolutionDAE.dat".to_string(),
            transient_initial_condition: false,
            initial_condition: true,
            mechanism_file: None,
            log_every: 100,
        }
    }
}

impl RunSettings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path.as_ref())?;
        let settings: RunSettings = serde_json::from_str(&content)?;
        settings.validate()?;
        info!("run settings loaded from {}", path.as_ref().display());
        Ok(settings)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let r = &self.reactor;
        if !(r.mdot_in >= 0.0) || !(r.volume > 0.0) || !(r.catalytic_area >= 0.0) {
            return Err(SettingsError::Invalid(
                "reactor: mdot_in and catalytic_area must be non-negative, volume positive".to_string(),
            ));
        }
        self.time.check("time")?;
        self.surface_relaxation.check("surface_relaxation")?;
        if self.batch.batch_size == 0 {
            return Err(SettingsError::Invalid("batch: batch_size must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Snapshot frequency, `None` when snapshots are disabled.
    pub fn snapshot_frequency(&self) -> Option<usize> {
        (self.output_frequency > 0).then_some(self.output_frequency as usize)
    }
}
