//! Zero-phase Butterworth low-pass filter.
//!
//! # Algorithm
//!
//! 1. Analog prototype poles `-exp(iπm/2N)`, `m = -N+1, -N+3, …, N-1`
//! 2. Pre-warp the normalised cutoff and scale the prototype
//! 3. Bilinear transform (all zeros land at z = -1)
//! 4. Expand to transfer-function coefficients `(b, a)`
//!
//! Filtering runs the difference equation forward then backward over the
//! signal, extended at both ends by odd reflection of
//! `3·max(len(a), len(b))` samples, with steady-state initial conditions.

use std::f64::consts::PI;

use nalgebra::{Complex, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// Low-pass policy constants: cutoff and sample rate share units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    pub cutoff: f64,
    pub sample_rate: f64,
    pub order: usize,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            cutoff: 50.0,
            sample_rate: 1000.0,
            order: 9,
        }
    }
}

impl FilterParams {
    /// Cutoff as a fraction of the Nyquist frequency.
    pub fn normalized_cutoff(&self) -> f64 {
        self.cutoff / (self.sample_rate / 2.0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(MatchError::FilterDesign("filter order must be at least 1".into()));
        }
        let wn = self.normalized_cutoff();
        if !(wn.is_finite() && wn > 0.0 && wn < 1.0) {
            return Err(MatchError::FilterDesign(format!(
                "cutoff {} must lie strictly between 0 and nyquist {}",
                self.cutoff,
                self.sample_rate / 2.0
            )));
        }
        Ok(())
    }
}

/// Designed digital Butterworth filter in transfer-function form.
#[derive(Debug, Clone)]
pub struct Butterworth {
    b: Vec<f64>,
    a: Vec<f64>,
    /// Steady-state initial conditions for a unit step.
    zi: Vec<f64>,
}

impl Butterworth {
    pub fn design(params: &FilterParams) -> Result<Self> {
        params.validate()?;
        let order = params.order;
        let fs2 = 4.0;
        let warped = fs2 * (PI * params.normalized_cutoff() / 2.0).tan();

        let poles: Vec<Complex<f64>> = (0..order)
            .map(|k| {
                let m = 2.0 * k as f64 - (order as f64 - 1.0);
                let theta = PI * m / (2.0 * order as f64);
                -Complex::new(theta.cos(), theta.sin()) * warped
            })
            .collect();

        let fs2c = Complex::new(fs2, 0.0);
        let digital_poles: Vec<Complex<f64>> =
            poles.iter().map(|p| (fs2c + p) / (fs2c - p)).collect();
        let denominator = poles.iter().fold(Complex::new(1.0, 0.0), |acc, p| acc * (fs2c - p));
        let gain = warped.powi(order as i32) * (Complex::new(1.0, 0.0) / denominator).re;

        let b: Vec<f64> = binomial_row(order).into_iter().map(|c| c * gain).collect();
        let a: Vec<f64> = poly_from_roots(&digital_poles).into_iter().map(|c| c.re).collect();
        let zi = steady_state(&b, &a)?;

        Ok(Butterworth { b, a, zi })
    }

    pub fn numerator(&self) -> &[f64] {
        &self.b
    }

    pub fn denominator(&self) -> &[f64] {
        &self.a
    }

    /// Samples of odd extension added at each end before filtering.
    pub fn padlen(&self) -> usize {
        3 * self.a.len().max(self.b.len())
    }

    /// Forward-backward filtering. The signal must be longer than [`Butterworth::padlen`].
    pub fn filtfilt(&self, signal: &[f64]) -> Result<Vec<f64>> {
        let n = signal.len();
        let edge = self.padlen();
        if n <= edge {
            return Err(MatchError::FilterDesign(format!(
                "signal of {n} samples is too short for padding of {edge}"
            )));
        }

        let first = signal[0];
        let last = signal[n - 1];
        let mut ext = Vec::with_capacity(n + 2 * edge);
        ext.extend((1..=edge).rev().map(|i| 2.0 * first - signal[i]));
        ext.extend_from_slice(signal);
        ext.extend((1..=edge).map(|i| 2.0 * last - signal[n - 1 - i]));

        let forward = self.lfilter(&ext, ext[0]);
        let mut reversed: Vec<f64> = forward.into_iter().rev().collect();
        let backward = self.lfilter(&reversed, reversed[0]);
        reversed.clear();
        reversed.extend(backward.into_iter().rev());

        Ok(reversed[edge..edge + n].to_vec())
    }

    /// Direct form II transposed, state initialised to `zi * initial`.
    fn lfilter(&self, x: &[f64], initial: f64) -> Vec<f64> {
        let (b, a) = (&self.b, &self.a);
        let taps = a.len();
        let mut state: Vec<f64> = self.zi.iter().map(|z| z * initial).collect();
        let mut out = Vec::with_capacity(x.len());
        for &xi in x {
            let yi = b[0] * xi + state[0];
            for j in 0..taps - 2 {
                state[j] = b[j + 1] * xi + state[j + 1] - a[j + 1] * yi;
            }
            state[taps - 2] = b[taps - 1] * xi - a[taps - 1] * yi;
            out.push(yi);
        }
        out
    }
}

/// Design and apply in one call.
pub fn low_pass(signal: &[f64], params: &FilterParams) -> Result<Vec<f64>> {
    Butterworth::design(params)?.filtfilt(signal)
}

/// Coefficients of `(z + 1)^n`.
fn binomial_row(n: usize) -> Vec<f64> {
    let mut row = vec![1.0];
    for _ in 0..n {
        let mut next = vec![1.0; row.len() + 1];
        for k in 1..row.len() {
            next[k] = row[k - 1] + row[k];
        }
        row = next;
    }
    row
}

/// Monic polynomial coefficients (highest power first) with the given roots.
fn poly_from_roots(roots: &[Complex<f64>]) -> Vec<Complex<f64>> {
    let mut coeffs = vec![Complex::new(1.0, 0.0)];
    for r in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coeffs.len() + 1];
        for (k, c) in coeffs.iter().enumerate() {
            next[k] += c;
            next[k + 1] -= c * r;
        }
        coeffs = next;
    }
    coeffs
}

/// Initial state giving the steady-state response to a unit step:
/// solves `(I - Cᵀ) zi = b[1..] - a[1..]·b[0]` with `C` the companion matrix of `a`.
fn steady_state(b: &[f64], a: &[f64]) -> Result<Vec<f64>> {
    let m = a.len() - 1;
    let system = DMatrix::from_fn(m, m, |i, j| {
        let identity = if i == j { 1.0 } else { 0.0 };
        let companion_t = if j == 0 {
            -a[i + 1]
        } else if j == i + 1 {
            1.0
        } else {
            0.0
        };
        identity - companion_t
    });
    let rhs = DVector::from_fn(m, |i, _| b[i + 1] - a[i + 1] * b[0]);
    system
        .lu()
        .solve(&rhs)
        .map(|zi| zi.iter().copied().collect())
        .ok_or_else(|| MatchError::FilterDesign("singular steady-state system".into()))
}
