//! In-place dense LU with partial pivoting on scratch-backed matrix views.
//!
//! Pivots are stored LAPACK style: at elimination step `k` row `k` was swapped with
//! row `pivots[k]`, so solving needs no temporary vector.

use nalgebra::DMatrixViewMut;

/// Pivot magnitude below which the matrix is treated as singular.
pub const SINGULAR_PIVOT: f64 = 1e-300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SingularMatrix {
    pub column: usize,
}

pub fn lu_factor(a: &mut DMatrixViewMut<'_, f64>, pivots: &mut [usize]) -> Result<(), SingularMatrix> {
    let n = a.nrows();
    for k in 0..n {
        let mut max_row = k;
        let mut max_val = a[(k, k)].abs();
        for i in (k + 1)..n {
            let v = a[(i, k)].abs();
            if v > max_val {
                max_val = v;
                max_row = i;
            }
        }
        if !(max_val > SINGULAR_PIVOT) {
            return Err(SingularMatrix { column: k });
        }
        pivots[k] = max_row;
        if max_row != k {
            a.swap_rows(k, max_row);
        }
        let akk = a[(k, k)];
        for i in (k + 1)..n {
            let lik = a[(i, k)] / akk;
            a[(i, k)] = lik;
            for j in (k + 1)..n {
                let akj = a[(k, j)];
                a[(i, j)] -= lik * akj;
            }
        }
    }
    Ok(())
}

/// Solves `A x = b` in place given the factors from [`lu_factor`].
pub fn lu_solve(lu: &DMatrixViewMut<'_, f64>, pivots: &[usize], b: &mut [f64]) {
    let n = lu.nrows();
    for k in 0..n {
        b.swap(k, pivots[k]);
    }
    for i in 0..n {
        let mut s = b[i];
        for j in 0..i {
            s -= lu[(i, j)] * b[j];
        }
        b[i] = s;
    }
    for i in (0..n).rev() {
        let mut s = b[i];
        for j in (i + 1)..n {
            s -= lu[(i, j)] * b[j];
        }
        b[i] = s / lu[(i, i)];
    }
}
