#![allow(dead_code)]

use rusty_raman::{Catalog, CatalogRecord, Spectrum};

/// Small deterministic generator (splitmix64) so fixtures are reproducible.
pub struct TestRng(u64);

impl TestRng {
    pub fn new(seed: u64) -> Self {
        TestRng(seed)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

pub const STEP: f64 = 0.05;
pub const SAMPLES: usize = 2401;
/// Index of the true match in [`scenario_catalog`].
pub const TRUE_MATCH: usize = 2;

fn grid(start: f64) -> Vec<f64> {
    (0..SAMPLES).map(|k| start + k as f64 * STEP).collect()
}

/// `sin(x) + 0.1·x` with ±0.01 uniform noise on `[0, 120]`.
pub fn scenario_unknown() -> Spectrum {
    let mut rng = TestRng::new(7);
    let x = grid(0.0);
    let y = x
        .iter()
        .map(|&v| v.sin() + 0.1 * v + rng.uniform(-0.01, 0.01))
        .collect();
    Spectrum { x, y }
}

/// Five records on a grid shifted by 3.025: four uniform-noise spectra and
/// a clean `sin(x)` at [`TRUE_MATCH`].
pub fn scenario_catalog() -> Catalog {
    let mut rng = TestRng::new(11);
    let x = grid(3.025);
    let records = (0..5)
        .map(|i| {
            let y: Vec<f64> = if i == TRUE_MATCH {
                x.iter().map(|v| v.sin()).collect()
            } else {
                x.iter().map(|_| rng.next_f64()).collect()
            };
            CatalogRecord::new(format!("ref_{i}"), Spectrum { x: x.clone(), y })
        })
        .collect();
    Catalog::from_records(records)
}
