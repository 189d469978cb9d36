use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// MatchError – everything the matching core can fail with
// ---------------------------------------------------------------------------

/// Errors raised by the alignment / baseline / filter / scoring pipeline.
///
/// Per-record failures are collected by the ranking driver instead of
/// aborting the batch; the same variants raised while validating the
/// unknown spectrum are fatal for the whole run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Domain is too short, mismatched with its intensities, or not strictly increasing.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// Domains do not overlap after alignment, or the reference escapes the unknown's range.
    #[error("alignment invariant violated: {0}")]
    AlignmentInvariant(String),

    /// Low-pass filter cannot be designed or applied.
    #[error("filter design error: {0}")]
    FilterDesign(String),

    /// Penalized least-squares system could not be factorized.
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// A conditioned signal has zero variance, so the correlation is undefined.
    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),

    /// Configuration value outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The batch did not finish before the caller's deadline.
    #[error("batch did not complete within {0:?}")]
    BatchTimeout(Duration),

    /// The batch worker stopped without delivering a report.
    #[error("batch aborted: {0}")]
    BatchAborted(String),
}

/// Result alias for the matching core.
pub type Result<T> = std::result::Result<T, MatchError>;
