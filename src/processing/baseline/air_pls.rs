//! Adaptive iteratively reweighted penalized least squares (airPLS).
//!
//! Each iteration solves the Whittaker system
//!
//! ```text
//! (W + λ·DᵀD) z = W x
//! ```
//!
//! with `D` the difference operator of the configured order, then re-weights:
//! samples above the baseline (peaks) get weight 0, samples below it get
//! `exp(i·|d|/|Σd⁻|)`, and both endpoints get `exp(i·max(d⁻)/|Σd⁻|)`.
//!
//! # References
//!
//! - Zhang, Z.-M., Chen, S., Liang, Y.-Z. "Baseline correction using
//!   adaptive iteratively reweighted penalized least squares."
//!   Analyst 135, 1138–1146 (2010).

use log::debug;
use nalgebra::DMatrix;
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use serde::{Deserialize, Serialize};

use super::BaselineEstimator;
use crate::error::{MatchError, Result};

/// Convergence threshold: negative-residual mass relative to `Σ|x|`.
const CONVERGENCE_RATIO: f64 = 0.001;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirPlsParams {
    /// Smoothness penalty λ.
    pub lambda: f64,
    /// Order of the difference operator in the penalty.
    pub order: usize,
    /// Iteration cap; 0 behaves like 1 (a single unweighted solve).
    pub max_iterations: usize,
}

impl Default for AirPlsParams {
    fn default() -> Self {
        Self {
            lambda: 500.0,
            order: 1,
            max_iterations: 1,
        }
    }
}

impl AirPlsParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(MatchError::InvalidConfig(format!(
                "airPLS lambda must be positive, got {}",
                self.lambda
            )));
        }
        if self.order == 0 {
            return Err(MatchError::InvalidConfig(
                "airPLS difference order must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl BaselineEstimator for AirPlsParams {
    fn estimate(&self, signal: &[f64]) -> Result<Vec<f64>> {
        self.validate()?;
        let m = signal.len();
        if m <= self.order {
            return Err(MatchError::InvalidConfig(format!(
                "difference order {} needs more than {m} samples",
                self.order
            )));
        }

        let iterations = self.max_iterations.max(1);
        let abs_sum: f64 = signal.iter().map(|v| v.abs()).sum();
        let mut weights = vec![1.0; m];
        let mut baseline = Vec::new();

        for i in 1..=iterations {
            baseline = whittaker(signal, &weights, self.lambda, self.order)?;
            let residual: Vec<f64> = signal.iter().zip(&baseline).map(|(x, z)| x - z).collect();
            let dssn = residual.iter().filter(|d| **d < 0.0).sum::<f64>().abs();

            if dssn == 0.0 || dssn < CONVERGENCE_RATIO * abs_sum {
                debug!("airPLS converged after {i} iteration(s)");
                break;
            }
            if i == iterations {
                debug!("airPLS stopped at iteration limit {iterations}");
                break;
            }

            let step = i as f64;
            let mut least_negative = f64::NEG_INFINITY;
            for (w, &d) in weights.iter_mut().zip(&residual) {
                if d >= 0.0 {
                    *w = 0.0;
                } else {
                    *w = (step * d.abs() / dssn).exp();
                    least_negative = least_negative.max(d);
                }
            }
            let edge = (step * least_negative / dssn).exp();
            weights[0] = edge;
            weights[m - 1] = edge;
        }

        Ok(baseline)
    }
}

/// Coefficients of one row of the `order`-th forward difference operator,
/// e.g. `[-1, 1]` for order 1 and `[1, -2, 1]` for order 2.
pub fn difference_coefficients(order: usize) -> Vec<f64> {
    let mut coefficients = vec![1.0];
    for _ in 0..order {
        let mut next = vec![0.0; coefficients.len() + 1];
        for (k, c) in coefficients.iter().enumerate() {
            next[k] -= c;
            next[k + 1] += c;
        }
        coefficients = next;
    }
    coefficients
}

/// Solve `(W + λ·DᵀD) z = W x` by sparse Cholesky factorization.
pub fn whittaker(signal: &[f64], weights: &[f64], lambda: f64, order: usize) -> Result<Vec<f64>> {
    let m = signal.len();
    let diff = difference_coefficients(order);

    let mut coo = CooMatrix::new(m, m);
    for (i, &w) in weights.iter().enumerate() {
        coo.push(i, i, w);
    }
    // DᵀD accumulated row by row; duplicates are summed on conversion
    for row in 0..m - order {
        for (a, ca) in diff.iter().enumerate() {
            for (b, cb) in diff.iter().enumerate() {
                coo.push(row + a, row + b, lambda * ca * cb);
            }
        }
    }
    let system = CscMatrix::from(&coo);

    let cholesky = CscCholesky::factor(&system)
        .map_err(|e| MatchError::SingularSystem(format!("penalized system not positive definite: {e:?}")))?;

    let rhs: Vec<f64> = signal.iter().zip(weights).map(|(x, w)| x * w).collect();
    let rhs = DMatrix::from_column_slice(m, 1, &rhs);
    let solution = cholesky.solve(&rhs);

    let baseline: Vec<f64> = solution.iter().copied().collect();
    if baseline.iter().any(|v| !v.is_finite()) {
        return Err(MatchError::SingularSystem(
            "penalized solve produced non-finite values".into(),
        ));
    }
    Ok(baseline)
}
