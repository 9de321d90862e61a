use serde::{Deserialize, Serialize};

/// Per-sample stepping record. Created from batch-wide defaults, then re-seeded after
/// every outer round from that sample's own achieved `(t, dt)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeAdvanceDescriptor {
    pub t_begin: f64,
    pub t_end: f64,
    pub dt: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    pub max_newton_iterations: usize,
    pub iterations_per_interval: usize,
}

impl TimeAdvanceDescriptor {
    pub fn check(&self) -> Result<(), String> {
        let finite = [self.t_begin, self.t_end, self.dt, self.dt_min, self.dt_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err("time settings must be finite".to_string());
        }
        if !(self.dt_min > 0.0) || self.dt_min > self.dt_max {
            return Err(format!(
                "step bounds must satisfy 0 < dt_min <= dt_max, got [{:e}, {:e}]",
                self.dt_min, self.dt_max
            ));
        }
        if self.t_end < self.t_begin {
            return Err(format!("t_end {} precedes t_begin {}", self.t_end, self.t_begin));
        }
        if self.max_newton_iterations == 0 || self.iterations_per_interval == 0 {
            return Err("iteration budgets must be at least 1".to_string());
        }
        Ok(())
    }

    /// The step actually attempted: `dt` clamped to the bounds and to what is left.
    pub fn proposed_step(&self, t: f64, dt: f64) -> f64 {
        dt.clamp(self.dt_min, self.dt_max).min(self.t_end - t)
    }

    pub fn reseed(&mut self, t: f64, dt: f64) {
        self.t_begin = t;
        self.dt = dt;
    }
}

/// `{atol, rtol}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub atol: f64,
    pub rtol: f64,
}

impl Tolerance {
    pub fn new(atol: f64, rtol: f64) -> Self {
        Tolerance { atol, rtol }
    }

    pub fn weight(&self, reference: f64) -> f64 {
        self.atol + self.rtol * reference.abs()
    }
}

/// Batch-wide read-only tolerances: one pair per differential unknown for the error
/// test and one pair for Newton convergence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceTable {
    pub time: Vec<Tolerance>,
    pub newton: Tolerance,
}

impl ToleranceTable {
    pub fn uniform(n_time_odes: usize, time: Tolerance, newton: Tolerance) -> Self {
        ToleranceTable {
            time: vec![time; n_time_odes],
            newton,
        }
    }

    pub fn check(&self, n_time_odes: usize) -> Result<(), String> {
        if self.time.len() != n_time_odes {
            return Err(format!(
                "tolerance table has {} entries for {} differential unknowns",
                self.time.len(),
                n_time_odes
            ));
        }
        let positive = |t: &Tolerance| t.atol >= 0.0 && t.rtol >= 0.0 && t.atol + t.rtol > 0.0;
        if !self.time.iter().all(positive) || !positive(&self.newton) {
            return Err("tolerances must be non-negative and not both zero".to_string());
        }
        Ok(())
    }
}

/// Weighted RMS norm `sqrt(mean((v_i / (atol_i + rtol_i |ref_i|))^2))`.
pub fn wrms_norm<F: Fn(usize) -> Tolerance>(values: &[f64], reference: &[f64], tol: F) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values
        .iter()
        .zip(reference)
        .enumerate()
        .map(|(i, (v, r))| {
            let e = v / tol(i).weight(*r);
            e * e
        })
        .sum();
    (sum / values.len() as f64).sqrt()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepDecision {
    Accept { next_dt: f64 },
    Reject { next_dt: f64 },
    /// The rejected step cannot shrink further without going below `dt_min`.
    Underflow { next_dt: f64 },
}

/// Second-order step size controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeController {
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    /// upper bound of the shrink factor after a rejection
    pub reject_max_factor: f64,
}

impl Default for StepSizeController {
    fn default() -> Self {
        StepSizeController {
            safety: 0.9,
            min_factor: 0.25,
            max_factor: 4.0,
            reject_max_factor: 0.9,
        }
    }
}

impl StepSizeController {
    fn factor(&self, err_norm: f64, upper: f64) -> f64 {
        if !err_norm.is_finite() {
            return self.min_factor;
        }
        if err_norm == 0.0 {
            return upper;
        }
        (self.safety * err_norm.powf(-1.0 / 3.0)).clamp(self.min_factor, upper)
    }

    pub fn decide(&self, dt: f64, err_norm: f64, dt_min: f64, dt_max: f64) -> StepDecision {
        if err_norm <= 1.0 {
            let next_dt = (dt * self.factor(err_norm, self.max_factor)).clamp(dt_min, dt_max);
            return StepDecision::Accept { next_dt };
        }
        self.shrink(dt, self.factor(err_norm, self.reject_max_factor), dt_min)
    }

    /// Rejection with a fixed factor, used after a Newton failure or an
    /// inadmissible candidate.
    pub fn shrink(&self, dt: f64, factor: f64, dt_min: f64) -> StepDecision {
        let next_dt = dt * factor;
        if next_dt < dt_min {
            StepDecision::Underflow { next_dt }
        } else {
            StepDecision::Reject { next_dt }
        }
    }
}
