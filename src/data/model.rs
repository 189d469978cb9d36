use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

// ---------------------------------------------------------------------------
// Spectrum – paired domain / intensity samples
// ---------------------------------------------------------------------------

/// A single measured spectrum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Raman shift axis (x), strictly increasing.
    pub x: Vec<f64>,
    /// Intensity axis (y) – same length as `x`.
    pub y: Vec<f64>,
}

impl Spectrum {
    /// Build a spectrum, rejecting anything [`Spectrum::validate`] would.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let spectrum = Spectrum { x, y };
        spectrum.validate()?;
        Ok(spectrum)
    }

    /// Check `len(x) == len(y) >= 2`, finite samples and a strictly increasing domain.
    pub fn validate(&self) -> Result<()> {
        self.view().validate()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the spectrum holds no samples.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Borrow the whole spectrum.
    pub fn view(&self) -> SpectrumView<'_> {
        SpectrumView {
            x: &self.x,
            y: &self.y,
        }
    }
}

// ---------------------------------------------------------------------------
// SpectrumView – borrowed window into a spectrum
// ---------------------------------------------------------------------------

/// Borrowed, possibly trimmed, window of a [`Spectrum`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumView<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
}

impl<'a> SpectrumView<'a> {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Smallest domain value (infinite for an empty view).
    pub fn x_min(&self) -> f64 {
        self.x.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn x_max(&self) -> f64 {
        self.x.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Narrow the view to `range` (indices into this view).
    pub fn slice(&self, range: std::ops::Range<usize>) -> SpectrumView<'a> {
        SpectrumView {
            x: &self.x[range.clone()],
            y: &self.y[range],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.x.len() != self.y.len() {
            return Err(MatchError::InvalidDomain(format!(
                "x has {} samples but y has {}",
                self.x.len(),
                self.y.len()
            )));
        }
        if self.x.len() < 2 {
            return Err(MatchError::InvalidDomain(format!(
                "need at least 2 samples, got {}",
                self.x.len()
            )));
        }
        if let Some(i) = self.x.iter().chain(self.y).position(|v| !v.is_finite()) {
            return Err(MatchError::InvalidDomain(format!(
                "non-finite sample at flat position {i}"
            )));
        }
        if let Some(i) = self.x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(MatchError::InvalidDomain(format!(
                "domain not strictly increasing at index {}: {} -> {}",
                i + 1,
                self.x[i],
                self.x[i + 1]
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CatalogRecord / Catalog – the reference library
// ---------------------------------------------------------------------------

/// One labelled reference spectrum. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub label: String,
    pub spectrum: Spectrum,
}

impl CatalogRecord {
    pub fn new(label: impl Into<String>, spectrum: Spectrum) -> Self {
        CatalogRecord {
            label: label.into(),
            spectrum,
        }
    }
}

/// In-memory snapshot of the reference catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    pub fn from_records(records: Vec<CatalogRecord>) -> Self {
        Catalog { records }
    }

    /// Every reference entry, in catalog order. Indices into this slice are
    /// the catalog indices reported in ranked matches.
    pub fn fetch_all(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&CatalogRecord> {
        self.records.get(index)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.records
    }
}
