use super::R_UNIV;
use serde::{Deserialize, Serialize};

/// Two-range NASA 7-coefficient polynomial.
///
/// `cp/R = a1 + a2 T + a3 T^2 + a4 T^3 + a5 T^4`,
/// `h/RT = a1 + a2 T/2 + a3 T^2/3 + a4 T^3/4 + a5 T^4/5 + a6/T`,
/// `s/R = a1 ln T + a2 T + a3 T^2/2 + a4 T^3/3 + a5 T^4/4 + a7`.
/// Temperatures outside `[t_low, t_high]` use the nearest range unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nasa7 {
    pub t_low: f64,
    pub t_mid: f64,
    pub t_high: f64,
    /// coefficients for `t_low <= T < t_mid`
    pub low: [f64; 7],
    /// coefficients for `t_mid <= T <= t_high`
    pub high: [f64; 7],
}

impl Nasa7 {
    pub fn new(t_low: f64, t_mid: f64, t_high: f64, low: [f64; 7], high: [f64; 7]) -> Self {
        Nasa7 {
            t_low,
            t_mid,
            t_high,
            low,
            high,
        }
    }

    fn coeffs(&self, t: f64) -> &[f64; 7] {
        if t < self.t_mid { &self.low } else { &self.high }
    }

    pub fn cp_over_r(&self, t: f64) -> f64 {
        let a = self.coeffs(t);
        a[0] + t * (a[1] + t * (a[2] + t * (a[3] + t * a[4])))
    }

    pub fn h_over_rt(&self, t: f64) -> f64 {
        let a = self.coeffs(t);
        a[0] + t * (a[1] / 2.0 + t * (a[2] / 3.0 + t * (a[3] / 4.0 + t * a[4] / 5.0))) + a[5] / t
    }

    pub fn s_over_r(&self, t: f64) -> f64 {
        let a = self.coeffs(t);
        a[0] * t.ln() + t * (a[1] + t * (a[2] / 2.0 + t * (a[3] / 3.0 + t * a[4] / 4.0))) + a[6]
    }

    /// J/(kmol·K)
    pub fn cp_molar(&self, t: f64) -> f64 {
        R_UNIV * self.cp_over_r(t)
    }

    /// J/kmol
    pub fn h_molar(&self, t: f64) -> f64 {
        R_UNIV * t * self.h_over_rt(t)
    }

    pub fn is_valid(&self) -> bool {
        self.t_low > 0.0
            && self.t_low < self.t_mid
            && self.t_mid < self.t_high
            && self.low.iter().chain(self.high.iter()).all(|c| c.is_finite())
    }
}
