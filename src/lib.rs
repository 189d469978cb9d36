//! Raman spectrum identification: match an unknown, baseline-corrupted
//! spectrum against a reference catalog and rank the closest entries.

pub mod config;
pub mod data;
pub mod error;
pub mod processing;

pub use config::{MatchConfig, MethodKind};
pub use data::loader::{load_catalog, load_spectrum};
pub use data::model::{Catalog, CatalogRecord, Spectrum, SpectrumView};
pub use error::{MatchError, Result};
pub use processing::pipeline::{MatchPipeline, ProcessedPair, match_score};
pub use processing::ranking::{RankedMatch, RankingDriver, RankingReport, RecordFailure};
