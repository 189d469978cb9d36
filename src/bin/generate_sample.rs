use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rusty_raman::data::loader::write_parquet_catalog;
use rusty_raman::{CatalogRecord, Spectrum};

/// Write a synthetic reference catalog and a noisy unknown drawn from it.
#[derive(Parser, Debug)]
#[command(name = "generate-sample")]
struct Args {
    /// Number of reference spectra
    #[arg(short, long, default_value = "40")]
    records: usize,

    /// Catalog entry the unknown is derived from
    #[arg(short, long, default_value = "7")]
    target: usize,

    #[arg(short, long, default_value = "42")]
    seed: u64,

    #[arg(long, default_value = "sample_catalog.parquet")]
    catalog: PathBuf,

    #[arg(long, default_value = "sample_unknown.csv")]
    unknown: PathBuf,
}

/// `(centre, width, amplitude)` of one Raman band.
type Band = (f64, f64, f64);

fn gaussian(x: f64, (mu, sigma, amplitude): Band) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

fn render(domain: &[f64], bands: &[Band]) -> Vec<f64> {
    domain
        .iter()
        .map(|&x| bands.iter().map(|&b| gaussian(x, b)).sum())
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn random_bands(rng: &mut SimpleRng) -> Vec<Band> {
    let count = 3 + (rng.next_u64() % 5) as usize;
    (0..count)
        .map(|_| (rng.uniform(200.0, 1700.0), rng.uniform(4.0, 15.0), rng.uniform(0.2, 1.0)))
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(args.target < args.records, "--target must be below --records");
    let mut rng = SimpleRng::new(args.seed);

    // Raman shift 100 → 1800 cm⁻¹, step 1
    let domain: Vec<f64> = (0..=1700).map(|i| 100.0 + i as f64).collect();

    let library: Vec<Vec<Band>> = (0..args.records).map(|_| random_bands(&mut rng)).collect();
    let records: Vec<CatalogRecord> = library
        .iter()
        .enumerate()
        .map(|(i, bands)| {
            let spectrum = Spectrum {
                x: domain.clone(),
                y: render(&domain, bands),
            };
            CatalogRecord::new(format!("mineral_{i:03}"), spectrum)
        })
        .collect();
    write_parquet_catalog(&args.catalog, &records)?;

    // Unknown: narrower, finer grid with a sloped fluorescence background and noise
    let unknown_x: Vec<f64> = (0..2000).map(|i| 150.25 + i as f64 * 0.8).collect();
    let clean = render(&unknown_x, &library[args.target]);
    let mut text = String::from("##TITLE=synthetic unknown\n##XUNITS=1/CM\n");
    for (&x, &y) in unknown_x.iter().zip(&clean) {
        let background = 0.4 + 3e-4 * x + 0.2 * (x / 600.0).sin();
        let noisy = y + background + rng.gauss(0.0, 0.01);
        writeln!(text, "{x:.4},{noisy:.6}")?;
    }
    std::fs::write(&args.unknown, text)
        .with_context(|| format!("writing {}", args.unknown.display()))?;

    println!(
        "Wrote {} spectra ({} points each) to {} and unknown (from mineral_{:03}) to {}",
        records.len(),
        domain.len(),
        args.catalog.display(),
        args.target,
        args.unknown.display()
    );
    Ok(())
}
