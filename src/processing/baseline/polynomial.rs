use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::BaselineEstimator;
use crate::error::{MatchError, Result};

/// Least-squares polynomial detrend over the sample index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolynomialParams {
    pub order: usize,
}

impl Default for PolynomialParams {
    fn default() -> Self {
        Self { order: 1 }
    }
}

impl BaselineEstimator for PolynomialParams {
    fn estimate(&self, signal: &[f64]) -> Result<Vec<f64>> {
        fit_polynomial(signal, self.order)
    }
}

/// Fitted values of the least-squares polynomial of `order` through
/// `(i, signal[i])`.
///
/// The index is mapped onto `[-1, 1]` before building the design matrix;
/// the fitted values are identical to a fit on the raw index but the
/// system stays well conditioned at higher orders.
pub fn fit_polynomial(signal: &[f64], order: usize) -> Result<Vec<f64>> {
    let n = signal.len();
    if n <= order {
        return Err(MatchError::InvalidConfig(format!(
            "polynomial order {order} needs more than {n} samples"
        )));
    }

    let scale = if n > 1 { 2.0 / (n - 1) as f64 } else { 0.0 };
    let design = DMatrix::from_fn(n, order + 1, |i, j| (i as f64 * scale - 1.0).powi(j as i32));
    let target = DVector::from_column_slice(signal);

    let coefficients = design
        .clone()
        .svd(true, true)
        .solve(&target, 1e-12)
        .map_err(|e| MatchError::SingularSystem(format!("polynomial fit failed: {e}")))?;

    Ok((design * coefficients).iter().copied().collect())
}
