// ============================================================
// Layer 5 — Linear Least Squares (OLS and Ridge)
// ============================================================
// Both models solve the same centred normal equations:
//
//   (XcᵀXc + αI) β = Xcᵀyc
//   intercept = ȳ − x̄·β
//
// α = 0 is ordinary least squares, α > 0 is ridge. Centring
// first keeps the intercept out of the penalty.
//
// The solve is a Gauss-Jordan elimination with partial
// pivoting on the diagonally equilibrated system, so a
// column's pivot is judged against its own scale and not
// against the widest column. Columns without a usable pivot
// (constant or linearly dependent features, or fewer rows
// than features) get a zero coefficient, so the fit is
// always finite even on two-row datasets.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::traits::{Predictor, Regressor};

/// Pivot tolerance on the unit-diagonal (equilibrated) system.
const PIVOT_TOLERANCE: f64 = 1e-10;

/// Least squares hyperparameters. `alpha == 0` is plain OLS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeastSquares {
    pub alpha: f64,
}

impl LeastSquares {
    pub fn ordinary() -> Self {
        Self { alpha: 0.0 }
    }

    pub fn ridge(alpha: f64) -> Self {
        Self { alpha }
    }
}

/// A fitted linear model: `price = intercept + Σ coefficients[i]·x[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept:    f64,
    pub coefficients: Vec<f64>,
}

impl Regressor for LeastSquares {
    type Fitted = LinearModel;

    fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> ModelResult<LinearModel> {
        let (n, f) = x.dim();
        if n == 0 {
            return Err(ModelError::data("cannot fit a linear model on zero rows"));
        }
        if y.len() != n {
            return Err(ModelError::data(format!(
                "feature matrix has {n} rows but target has {}",
                y.len()
            )));
        }
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(ModelError::data(format!(
                "ridge alpha must be a non-negative number, got {}",
                self.alpha
            )));
        }

        let x_mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| ModelError::data("cannot centre an empty feature matrix"))?;
        let y_mean = y.mean().unwrap_or(0.0);

        let xc = &x - &x_mean;
        let yc = &y - y_mean;

        let mut gram = xc.t().dot(&xc);
        for i in 0..f {
            gram[[i, i]] += self.alpha;
        }
        let rhs = xc.t().dot(&yc);

        let coefficients = solve_normal_equations(gram, rhs);
        let intercept    = y_mean - x_mean.dot(&coefficients);

        tracing::debug!(
            "Linear fit (alpha={}): intercept={:.4}, {} coefficients",
            self.alpha,
            intercept,
            coefficients.len()
        );

        Ok(LinearModel { intercept, coefficients: coefficients.to_vec() })
    }
}

impl Predictor for LinearModel {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

/// Solve `a · β = b` for a symmetric positive semi-definite `a`.
/// Free variables (no pivot) are set to zero.
///
/// The system is rescaled to `D⁻¹ a D⁻¹ · z = D⁻¹ b` with
/// `D = diag(√a_ii)`, solved for `z`, and mapped back as `β = D⁻¹ z`.
fn solve_normal_equations(mut a: Array2<f64>, mut b: Array1<f64>) -> Array1<f64> {
    let n = b.len();

    let d: Vec<f64> = (0..n)
        .map(|i| if a[[i, i]] > 0.0 { a[[i, i]].sqrt() } else { 1.0 })
        .collect();
    for i in 0..n {
        for j in 0..n {
            a[[i, j]] /= d[i] * d[j];
        }
        b[i] /= d[i];
    }
    let tol = PIVOT_TOLERANCE;

    let mut pivots: Vec<(usize, usize)> = Vec::with_capacity(n);
    let mut row = 0usize;

    for col in 0..n {
        if row == n {
            break;
        }

        // partial pivoting: largest magnitude in this column at or below `row`
        let best = (row..n)
            .max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))
            .unwrap_or(row);
        if a[[best, col]].abs() <= tol {
            continue;
        }
        if best != row {
            for k in 0..n {
                a.swap([best, k], [row, k]);
            }
            b.swap(best, row);
        }

        let p = a[[row, col]];
        for k in 0..n {
            a[[row, k]] /= p;
        }
        b[row] /= p;

        for r in 0..n {
            if r == row {
                continue;
            }
            let factor = a[[r, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[[r, k]] -= factor * a[[row, k]];
            }
            b[r] -= factor * b[row];
        }

        pivots.push((row, col));
        row += 1;
    }

    let mut beta = Array1::zeros(n);
    for (r, c) in pivots {
        beta[c] = b[r] / d[c];
    }
    beta
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_ols_recovers_exact_line() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![3.0, 5.0, 7.0, 9.0];
        let m = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        assert!(close(m.intercept, 1.0));
        assert!(close(m.coefficients[0], 2.0));
        assert!(close(m.predict_row(&[10.0]), 21.0));
    }

    #[test]
    fn test_ols_two_features() {
        // y = 3·x1 + 1·x2 + 5
        let x = array![[1.0, 0.0], [0.0, 1.0], [2.0, 1.0], [1.0, 3.0], [4.0, 2.0]];
        let y = x.rows().into_iter().map(|r| 3.0 * r[0] + r[1] + 5.0).collect::<Array1<f64>>();
        let m = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        assert!(close(m.coefficients[0], 3.0));
        assert!(close(m.coefficients[1], 1.0));
        assert!(close(m.intercept, 5.0));
    }

    #[test]
    fn test_rank_deficient_fit_is_finite() {
        // two rows, three features: more unknowns than equations
        let x = array![[1.0, 1.0, 0.0], [2.0, 0.0, 1.0]];
        let y = array![100.0, 80.0];
        let m = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        assert!(m.intercept.is_finite());
        assert!(m.coefficients.iter().all(|c| c.is_finite()));
        // the training rows are still reproduced exactly
        assert!(close(m.predict_row(&[1.0, 1.0, 0.0]), 100.0));
        assert!(close(m.predict_row(&[2.0, 0.0, 1.0]), 80.0));
    }

    #[test]
    fn test_small_scale_column_is_not_mistaken_for_constant() {
        // column 0 spans millions, column 1 is a 0/1 flag that alone drives the price
        let x = Array2::from_shape_fn((8, 2), |(i, j)| {
            if j == 0 { (i / 2) as f64 * 1e6 } else { (i % 2) as f64 }
        });
        let y = x.column(1).mapv(|v| 100.0 * v);
        let m = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        assert!(close(m.coefficients[1], 100.0));
        assert!(m.coefficients[0].abs() < 1e-9);
        assert!(close(m.predict_row(&[0.0, 0.0]), 0.0));
        assert!(close(m.predict_row(&[0.0, 1.0]), 100.0));
    }

    #[test]
    fn test_duplicate_column_is_still_dropped_after_rescaling() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [5.0, 5.0]];
        let y = array![2.0, 4.0, 6.0, 10.0];
        let m = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        assert_eq!(m.coefficients[1], 0.0);
        assert!(close(m.coefficients[0], 2.0));
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let y = array![2.0, 4.0, 6.0];
        let m = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        assert_eq!(m.coefficients[1], 0.0);
        assert!(close(m.coefficients[0], 2.0));
    }

    #[test]
    fn test_ridge_shrinks_coefficients() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let ols   = LeastSquares::ordinary().fit(x.view(), y.view()).unwrap();
        let ridge = LeastSquares::ridge(1.0).fit(x.view(), y.view()).unwrap();
        assert!(ridge.coefficients[0].abs() < ols.coefficients[0].abs());
        // Σ(xc²) = 5 → β = 5·2 / (5 + 1)
        assert!(close(ridge.coefficients[0], 10.0 / 6.0));
    }

    #[test]
    fn test_rejects_negative_alpha() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 2.0];
        assert!(matches!(
            LeastSquares::ridge(-1.0).fit(x.view(), y.view()),
            Err(ModelError::Data(_))
        ));
    }

    #[test]
    fn test_rejects_empty_input() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        assert!(LeastSquares::ordinary().fit(x.view(), y.view()).is_err());
    }
}
