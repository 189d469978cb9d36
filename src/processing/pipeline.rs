//! One unknown spectrum against one catalog record.
//!
//! ```text
//!   align → baseline (unknown only) → low-pass (both) → normalize (both) → score
//! ```
//!
//! A pipeline holds only its configuration and the designed filter, both
//! read-only after construction, so one instance can be shared by every
//! worker of a ranking run.

use crate::config::MatchConfig;
use crate::data::model::{Spectrum, SpectrumView};
use crate::error::Result;
use crate::processing::align::align;
use crate::processing::baseline::BaselineEstimator;
use crate::processing::filter::Butterworth;
use crate::processing::normalize::normalize;
use crate::processing::similarity;

/// Both conditioned signals on their aligned domains, plus the score.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPair {
    /// Baseline-corrected, filtered, normalized unknown.
    pub unknown: Spectrum,
    /// Filtered, normalized reference.
    pub reference: Spectrum,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct MatchPipeline {
    config: MatchConfig,
    filter: Butterworth,
}

impl MatchPipeline {
    /// Validate the configuration and design the low-pass filter once.
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let filter = Butterworth::design(&config.filter)?;
        Ok(Self { config, filter })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Minimum number of samples a signal needs to survive the filter.
    pub fn min_samples(&self) -> usize {
        self.filter.padlen() + 1
    }

    pub fn process(&self, unknown: SpectrumView<'_>, reference: SpectrumView<'_>) -> Result<ProcessedPair> {
        let pair = align(unknown, reference)?;

        let corrected = self.config.baseline.correct(pair.unknown.y)?;
        let unknown_y = self.condition(&corrected)?;
        let reference_y = self.condition(pair.reference.y)?;

        let score = similarity::score(pair.unknown.x, &unknown_y, pair.reference.x, &reference_y)?;

        Ok(ProcessedPair {
            unknown: Spectrum {
                x: pair.unknown.x.to_vec(),
                y: unknown_y,
            },
            reference: Spectrum {
                x: pair.reference.x.to_vec(),
                y: reference_y,
            },
            score,
        })
    }

    pub fn score(&self, unknown: SpectrumView<'_>, reference: SpectrumView<'_>) -> Result<f64> {
        self.process(unknown, reference).map(|p| p.score)
    }

    fn condition(&self, signal: &[f64]) -> Result<Vec<f64>> {
        let filtered = self.filter.filtfilt(signal)?;
        Ok(normalize(&filtered, self.config.relaxation_passes))
    }
}

/// Single-shot form: build a pipeline for `config` and score one pair.
pub fn match_score(unknown: &Spectrum, reference: &Spectrum, config: &MatchConfig) -> Result<f64> {
    MatchPipeline::new(config.clone())?.score(unknown.view(), reference.view())
}
