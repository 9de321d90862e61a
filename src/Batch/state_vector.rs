//! Packed per-sample gas state `[density, pressure, temperature, Y_1..Y_n]`.

/// Tolerance on the mass (and site) fraction sum and on small negative entries.
pub const FRACTION_TOLERANCE: f64 = 1e-6;

pub fn get_state_vector_size(n_spec: usize) -> usize {
    3 + n_spec
}

/// Borrowing view over one state row. Works for both `&[f64]` and `&mut [f64]`.
#[derive(Debug)]
pub struct StateVector<T> {
    n_spec: usize,
    data: T,
}

impl<T: AsRef<[f64]>> StateVector<T> {
    pub fn new(n_spec: usize, data: T) -> Self {
        StateVector { n_spec, data }
    }

    pub fn n_spec(&self) -> usize {
        self.n_spec
    }

    pub fn density(&self) -> f64 {
        self.data.as_ref()[0]
    }

    pub fn pressure(&self) -> f64 {
        self.data.as_ref()[1]
    }

    pub fn temperature(&self) -> f64 {
        self.data.as_ref()[2]
    }

    pub fn mass_fractions(&self) -> &[f64] {
        &self.data.as_ref()[3..3 + self.n_spec]
    }

    /// Checks length, finiteness, positivity of the thermodynamic fields and the
    /// mass fraction invariants. The error string names the first violation.
    pub fn check(&self) -> Result<(), String> {
        let data = self.data.as_ref();
        let expected = get_state_vector_size(self.n_spec);
        if data.len() != expected {
            return Err(format!(
                "length {} does not match 3 + {} species",
                data.len(),
                self.n_spec
            ));
        }
        if let Some(i) = data.iter().position(|v| !v.is_finite()) {
            return Err(format!("entry {i} is not finite"));
        }
        for (name, value) in [
            ("density", self.density()),
            ("pressure", self.pressure()),
            ("temperature", self.temperature()),
        ] {
            if value <= 0.0 {
                return Err(format!("{name} = {value} is not positive"));
            }
        }
        check_fractions("mass fraction", self.mass_fractions())
    }

    pub fn is_valid(&self) -> bool {
        self.check().is_ok()
    }
}

impl<T: AsRef<[f64]> + AsMut<[f64]>> StateVector<T> {
    pub fn set_density(&mut self, value: f64) {
        self.data.as_mut()[0] = value;
    }

    pub fn set_pressure(&mut self, value: f64) {
        self.data.as_mut()[1] = value;
    }

    pub fn set_temperature(&mut self, value: f64) {
        self.data.as_mut()[2] = value;
    }

    pub fn mass_fractions_mut(&mut self) -> &mut [f64] {
        let n = self.n_spec;
        &mut self.data.as_mut()[3..3 + n]
    }
}

/// Site fractions of the surface phase. Same invariants as the mass fractions.
pub fn check_site_fractions(site_fractions: &[f64]) -> Result<(), String> {
    if let Some(i) = site_fractions.iter().position(|v| !v.is_finite()) {
        return Err(format!("site fraction {i} is not finite"));
    }
    check_fractions("site fraction", site_fractions)
}

fn check_fractions(what: &str, fractions: &[f64]) -> Result<(), String> {
    if fractions.is_empty() {
        return Ok(());
    }
    if let Some((i, v)) = fractions
        .iter()
        .enumerate()
        .find(|(_, v)| **v < -FRACTION_TOLERANCE)
    {
        return Err(format!("{what} {i} = {v} is negative"));
    }
    let sum: f64 = fractions.iter().sum();
    if (sum - 1.0).abs() > FRACTION_TOLERANCE {
        return Err(format!("{what}s sum to {sum}, expected 1"));
    }
    Ok(())
}

/// Clips negative fractions to zero and rescales so they sum to one.
/// Leaves the slice untouched when nothing positive remains.
pub fn normalize_fractions(fractions: &mut [f64]) {
    for v in fractions.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
    let sum: f64 = fractions.iter().sum();
    if sum > 0.0 {
        fractions.iter_mut().for_each(|v| *v /= sum);
    }
}
