// Minimum-norm ordinary least squares for the attribution model
//
// Solves the normal equations of `sales ~ 1 + factors` through a cyclic
// Jacobi eigendecomposition of the 6x6 Gram matrix. Eigenvalues below a
// relative cutoff are treated as rank deficiency and skipped, which is the
// pseudo-inverse identity pinv(A)b = pinv(A'A)A'b: a rank-deficient design
// (collinear factors, or fewer rows than parameters) takes the same code
// path and yields the minimum-norm coefficient vector instead of crashing.
//
// All arithmetic is f64: the Gram entries accumulate products of currency
// and spend magnitudes.

use crate::factor::Factor;
use serde::Serialize;

/// Number of explanatory factors in the design
pub const FACTORS: usize = Factor::ALL.len();

/// Parameters of the fit: intercept plus one coefficient per factor
const PARAMS: usize = FACTORS + 1;

/// Result of the least-squares solve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeastSquaresFit {
    /// Intercept term (carries no delta in attribution)
    pub intercept: f64,
    /// Factor coefficients in `Factor::ALL` order
    pub coefficients: [f64; FACTORS],
    /// Numerical rank of the design matrix
    pub rank: usize,
    /// True when the solve fell back to the minimum-norm solution
    pub degenerate: bool,
}

/// Jacobi eigendecomposition of a symmetric matrix
///
/// Returns (eigenvalues, eigenvectors); eigenvector k is column k of the
/// returned matrix. Convergence for a 6x6 takes a handful of sweeps.
fn jacobi_eigen(
    mut a: [[f64; PARAMS]; PARAMS],
) -> ([f64; PARAMS], [[f64; PARAMS]; PARAMS]) {
    const MAX_SWEEPS: usize = 64;

    let mut v = [[0.0_f64; PARAMS]; PARAMS];
    for (i, row) in v.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    let mut scale = 0.0_f64;
    for row in &a {
        for &x in row {
            scale += x * x;
        }
    }
    let scale = scale.sqrt();

    for _sweep in 0..MAX_SWEEPS {
        let mut off = 0.0_f64;
        for p in 0..PARAMS {
            for q in (p + 1)..PARAMS {
                off += a[p][q] * a[p][q];
            }
        }
        if scale == 0.0 || off.sqrt() <= 1e-15 * scale {
            break;
        }

        for p in 0..(PARAMS - 1) {
            for q in (p + 1)..PARAMS {
                if a[p][q] == 0.0 {
                    continue;
                }
                let tau = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = if tau >= 0.0 {
                    1.0 / (tau + (1.0 + tau * tau).sqrt())
                } else {
                    -1.0 / (-tau + (1.0 + tau * tau).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                // A <- J' A J (columns, then rows)
                for k in 0..PARAMS {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..PARAMS {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                // V <- V J
                for k in 0..PARAMS {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut eigenvalues = [0.0_f64; PARAMS];
    for (i, value) in eigenvalues.iter_mut().enumerate() {
        *value = a[i][i];
    }
    (eigenvalues, v)
}

/// Fit `targets ~ 1 + rows` by least squares
///
/// `rows` holds the five factor values per observation in `Factor::ALL`
/// order; the intercept column is added here. `rank_tolerance` is the
/// relative eigenvalue cutoff for rank detection.
pub fn fit_least_squares(
    rows: &[[f64; FACTORS]],
    targets: &[f64],
    rank_tolerance: f64,
) -> LeastSquaresFit {
    debug_assert_eq!(rows.len(), targets.len());

    // Gram matrix X'X and right-hand side X'y, X = [1 | factors]
    let mut gram = [[0.0_f64; PARAMS]; PARAMS];
    let mut rhs = [0.0_f64; PARAMS];
    for (row, &y) in rows.iter().zip(targets.iter()) {
        let mut x = [0.0_f64; PARAMS];
        x[0] = 1.0;
        x[1..].copy_from_slice(row);
        for i in 0..PARAMS {
            rhs[i] += x[i] * y;
            for j in 0..PARAMS {
                gram[i][j] += x[i] * x[j];
            }
        }
    }

    let (eigenvalues, eigenvectors) = jacobi_eigen(gram);
    let lambda_max = eigenvalues.iter().fold(0.0_f64, |acc, &l| acc.max(l));
    let cutoff = lambda_max * rank_tolerance;

    let mut beta = [0.0_f64; PARAMS];
    let mut rank = 0;
    for k in 0..PARAMS {
        if eigenvalues[k] > cutoff && eigenvalues[k] > 0.0 {
            rank += 1;
            let mut projection = 0.0_f64;
            for i in 0..PARAMS {
                projection += eigenvectors[i][k] * rhs[i];
            }
            let weight = projection / eigenvalues[k];
            for i in 0..PARAMS {
                beta[i] += weight * eigenvectors[i][k];
            }
        }
    }

    let degenerate = rank < PARAMS;
    tracing::debug!(
        "least-squares fit over {} rows: rank {}/{}, lambda_max {:.3e}{}",
        rows.len(),
        rank,
        PARAMS,
        lambda_max,
        if degenerate { " (minimum-norm fallback)" } else { "" }
    );

    let mut coefficients = [0.0_f64; FACTORS];
    coefficients.copy_from_slice(&beta[1..]);
    LeastSquaresFit {
        intercept: beta[0],
        coefficients,
        rank,
        degenerate,
    }
}
