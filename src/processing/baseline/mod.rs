//! Baseline estimation strategies.
//!
//! Every strategy maps a signal to a baseline of the same length; the
//! corrected signal is `signal - baseline`. Domains are never touched.
//!
//! ```text
//!   envelope     local-minimum spline envelope → iterated Savitzky–Golay
//!   air_pls      reweighted penalized least squares (sparse Cholesky)
//!   polynomial   least-squares polynomial over the sample index
//! ```
pub mod air_pls;
pub mod envelope;
pub mod polynomial;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use air_pls::AirPlsParams;
pub use envelope::EnvelopeParams;
pub use polynomial::PolynomialParams;

/// A way of estimating the slowly varying trend under a signal.
pub trait BaselineEstimator {
    /// Baseline of `signal`, same length as the input.
    fn estimate(&self, signal: &[f64]) -> Result<Vec<f64>>;

    /// `signal` with its estimated baseline subtracted.
    fn correct(&self, signal: &[f64]) -> Result<Vec<f64>> {
        let baseline = self.estimate(signal)?;
        Ok(signal.iter().zip(&baseline).map(|(s, b)| s - b).collect())
    }
}

/// Baseline strategy selected by configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum BaselineMethod {
    Envelope(EnvelopeParams),
    AirPls(AirPlsParams),
    Polynomial(PolynomialParams),
}

impl Default for BaselineMethod {
    fn default() -> Self {
        BaselineMethod::AirPls(AirPlsParams::default())
    }
}

impl BaselineMethod {
    /// Short name used in logs and reports.
    pub fn name(&self) -> &'static str {
        match self {
            BaselineMethod::Envelope(_) => "envelope",
            BaselineMethod::AirPls(_) => "air_pls",
            BaselineMethod::Polynomial(_) => "polynomial",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            BaselineMethod::Envelope(p) => p.validate(),
            BaselineMethod::AirPls(p) => p.validate(),
            BaselineMethod::Polynomial(_) => Ok(()),
        }
    }
}

impl BaselineEstimator for BaselineMethod {
    fn estimate(&self, signal: &[f64]) -> Result<Vec<f64>> {
        match self {
            BaselineMethod::Envelope(p) => p.estimate(signal),
            BaselineMethod::AirPls(p) => p.estimate(signal),
            BaselineMethod::Polynomial(p) => p.estimate(signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_strategy_preserves_length() {
        let y: Vec<f64> = (0..120).map(|k| (k as f64 / 9.0).sin() + 0.02 * k as f64).collect();
        for method in [
            BaselineMethod::Envelope(EnvelopeParams::default()),
            BaselineMethod::AirPls(AirPlsParams::default()),
            BaselineMethod::Polynomial(PolynomialParams { order: 3 }),
        ] {
            let corrected = method.correct(&y).unwrap();
            assert_eq!(corrected.len(), y.len(), "{}", method.name());
        }
    }

    #[test]
    fn tagged_json_selects_strategy() {
        let method: BaselineMethod =
            serde_json::from_str(r#"{"method":"air_pls","lambda":100.0}"#).unwrap();
        assert_eq!(
            method,
            BaselineMethod::AirPls(AirPlsParams {
                lambda: 100.0,
                ..Default::default()
            })
        );
        let method: BaselineMethod = serde_json::from_str(r#"{"method":"polynomial"}"#).unwrap();
        assert_eq!(method.name(), "polynomial");
    }
}
