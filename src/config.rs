use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result as MatchResult};
use crate::processing::baseline::{AirPlsParams, BaselineMethod, EnvelopeParams, PolynomialParams};
use crate::processing::filter::FilterParams;

// ---------------------------------------------------------------------------
// MatchConfig – the policy constants one ranking run uses
// ---------------------------------------------------------------------------

/// Everything a [`crate::processing::pipeline::MatchPipeline`] needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub baseline: BaselineMethod,
    pub filter: FilterParams,
    /// Number of `y²/mean` relaxation passes in the normalizer.
    pub relaxation_passes: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::air_pls()
    }
}

impl MatchConfig {
    fn with_baseline(baseline: BaselineMethod) -> Self {
        Self {
            baseline,
            filter: FilterParams::default(),
            relaxation_passes: 1,
        }
    }

    /// Double lower envelope smoothed by 100 Savitzky–Golay passes.
    pub fn envelope() -> Self {
        Self::with_baseline(BaselineMethod::Envelope(EnvelopeParams::default()))
    }

    /// airPLS with λ = 500, first-order penalty, one iteration.
    pub fn air_pls() -> Self {
        Self::with_baseline(BaselineMethod::AirPls(AirPlsParams::default()))
    }

    pub fn polynomial(order: usize) -> Self {
        Self::with_baseline(BaselineMethod::Polynomial(PolynomialParams { order }))
    }

    pub fn for_method(kind: MethodKind) -> Self {
        match kind {
            MethodKind::Envelope => Self::envelope(),
            MethodKind::AirPls => Self::air_pls(),
            MethodKind::Polynomial => Self::polynomial(PolynomialParams::default().order),
        }
    }

    /// Load a full override from JSON. Missing fields keep the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: MatchConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("validating config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> MatchResult<()> {
        self.baseline.validate()?;
        self.filter.validate()?;
        Ok(())
    }

    /// Short description for logs, e.g. `polynomial(order=3)`.
    pub fn describe(&self) -> String {
        match &self.baseline {
            BaselineMethod::Envelope(p) => {
                format!("envelope(window={}, iterations={})", p.window, p.iterations)
            }
            BaselineMethod::AirPls(p) => {
                format!("air_pls(lambda={}, itermax={})", p.lambda, p.max_iterations)
            }
            BaselineMethod::Polynomial(p) => format!("polynomial(order={})", p.order),
        }
    }
}

/// Baseline strategy names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MethodKind {
    Envelope,
    AirPls,
    Polynomial,
}

/// One polynomial configuration per order in `from..=to`.
pub fn polynomial_sweep(from: usize, to: usize) -> MatchResult<Vec<MatchConfig>> {
    if from > to {
        return Err(MatchError::InvalidConfig(format!(
            "empty polynomial order range {from}..={to}"
        )));
    }
    Ok((from..=to).map(MatchConfig::polynomial).collect())
}
