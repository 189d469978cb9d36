//! Matching core.
//!
//! ```text
//!   unknown ─┐
//!            ├─ align ─ baseline ─ filter ─ normalize ─ similarity ─→ score
//!   record  ─┘                                                        │
//!                                              ranking (per catalog) ◄┘
//! ```

pub mod align;
pub mod baseline;
pub mod filter;
pub mod normalize;
pub mod pipeline;
pub mod ranking;
pub mod similarity;
