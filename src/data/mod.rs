//! Data layer: spectra, the reference catalog, and file I/O.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv        two-column .csv
//!        │                              │
//!        ▼                              ▼
//!   ┌──────────────┐            ┌───────────────┐
//!   │ load_catalog │            │ load_spectrum │
//!   └──────────────┘            └───────────────┘
//!        │                              │
//!        ▼                              ▼
//!   ┌──────────┐                  ┌──────────┐
//!   │ Catalog  │  Vec<Record>     │ Spectrum │  unknown
//!   └──────────┘                  └──────────┘
//! ```

pub mod loader;
pub mod model;
