//! Lower-envelope + iterated Savitzky–Golay baseline.
//!
//! # Algorithm
//!
//! 1. Anchor on every strict local minimum plus both endpoints and
//!    interpolate a quadratic spline through the anchors (lower envelope).
//! 2. Repeat on the envelope itself (`envelope_passes`, default 2).
//! 3. Smooth the envelope with a Savitzky–Golay filter, feeding each output
//!    back in, `iterations` times (default window 11, order 1, 100 passes).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::BaselineEstimator;
use crate::error::{MatchError, Result};

/// Parameters of the envelope + smoothing baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeParams {
    /// How many times the lower envelope is re-extracted from its own output.
    pub envelope_passes: usize,
    /// Savitzky–Golay window length (odd).
    pub window: usize,
    /// Savitzky–Golay polynomial order.
    pub poly_order: usize,
    /// Number of chained smoothing passes.
    pub iterations: usize,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            envelope_passes: 2,
            window: 11,
            poly_order: 1,
            iterations: 100,
        }
    }
}

impl EnvelopeParams {
    pub fn validate(&self) -> Result<()> {
        if self.window % 2 == 0 || self.window <= self.poly_order {
            return Err(MatchError::InvalidConfig(format!(
                "Savitzky-Golay window must be odd and larger than the order ({}), got {}",
                self.poly_order, self.window
            )));
        }
        Ok(())
    }
}

impl BaselineEstimator for EnvelopeParams {
    fn estimate(&self, signal: &[f64]) -> Result<Vec<f64>> {
        self.validate()?;
        let mut envelope = signal.to_vec();
        for _ in 0..self.envelope_passes {
            envelope = lower_envelope(&envelope)?;
        }
        if self.iterations == 0 {
            return Ok(envelope);
        }
        let filter = SavitzkyGolay::new(self.window, self.poly_order)?;
        for _ in 0..self.iterations {
            envelope = filter.apply(&envelope)?;
        }
        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// Lower envelope
// ---------------------------------------------------------------------------

/// Indices of the envelope anchors: first sample, every point strictly lower
/// than both neighbours, last sample.
pub fn local_minima_anchors(y: &[f64]) -> Vec<usize> {
    let n = y.len();
    let mut anchors = Vec::with_capacity(n / 4 + 2);
    if n == 0 {
        return anchors;
    }
    anchors.push(0);
    for k in 1..n.saturating_sub(1) {
        if y[k] < y[k - 1] && y[k] < y[k + 1] {
            anchors.push(k);
        }
    }
    if n > 1 {
        anchors.push(n - 1);
    }
    anchors
}

/// Quadratic-spline lower envelope evaluated at every sample index.
/// Indices outside the anchor range are filled with 0.
pub fn lower_envelope(y: &[f64]) -> Result<Vec<f64>> {
    let anchors = local_minima_anchors(y);
    if anchors.len() < 2 {
        return Ok(vec![0.0; y.len()]);
    }
    let xs: Vec<f64> = anchors.iter().map(|&i| i as f64).collect();
    let ys: Vec<f64> = anchors.iter().map(|&i| y[i]).collect();

    let (lo, hi) = (xs[0], xs[xs.len() - 1]);
    let fill = |t: f64, f: &dyn Fn(f64) -> f64| if t < lo || t > hi { 0.0 } else { f(t) };

    if xs.len() < 3 {
        let slope = (ys[1] - ys[0]) / (xs[1] - xs[0]);
        return Ok((0..y.len())
            .map(|k| fill(k as f64, &|t| ys[0] + slope * (t - xs[0])))
            .collect());
    }

    let spline = QuadraticSpline::interpolate(&xs, &ys)?;
    Ok((0..y.len())
        .map(|k| fill(k as f64, &|t| spline.eval(t)))
        .collect())
}

/// Interpolating quadratic B-spline. Knots: first and last site with
/// multiplicity 3, interior knots at the midpoints between consecutive
/// sites, skipping the first and last midpoint.
#[derive(Debug, Clone)]
pub struct QuadraticSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
}

impl QuadraticSpline {
    /// `xs` must be strictly increasing with at least 3 sites.
    pub fn interpolate(xs: &[f64], ys: &[f64]) -> Result<Self> {
        let n = xs.len();
        if n < 3 || ys.len() != n {
            return Err(MatchError::InvalidDomain(format!(
                "quadratic spline needs >= 3 matching sites, got {} / {}",
                n,
                ys.len()
            )));
        }

        let mut knots = Vec::with_capacity(n + 3);
        knots.extend_from_slice(&[xs[0]; 3]);
        knots.extend((1..n - 2).map(|i| 0.5 * (xs[i] + xs[i + 1])));
        knots.extend_from_slice(&[xs[n - 1]; 3]);

        let mut spline = QuadraticSpline {
            knots,
            coefficients: Vec::new(),
        };

        // collocation matrix has at most two sub- and super-diagonals
        let mut band = BandMatrix::zeros(n, 2, 2);
        for (row, &x) in xs.iter().enumerate() {
            let span = spline.span(x);
            let basis = spline.basis(span, x);
            for (offset, value) in basis.iter().enumerate() {
                band.set(row, span - 2 + offset, *value);
            }
        }
        spline.coefficients = band.solve(ys.to_vec())?;
        Ok(spline)
    }

    pub fn eval(&self, x: f64) -> f64 {
        let span = self.span(x);
        let basis = self.basis(span, x);
        basis
            .iter()
            .zip(&self.coefficients[span - 2..=span])
            .map(|(b, c)| b * c)
            .sum()
    }

    /// Knot interval `[t_span, t_span+1)` containing `x`, clamped to the
    /// valid range `2..=n-1`.
    fn span(&self, x: f64) -> usize {
        let n = self.knots.len() - 3;
        let upper = self.knots[2..n].partition_point(|&t| t <= x) + 1;
        upper.clamp(2, n - 1)
    }

    /// Non-zero basis values `B_{span-2}, B_{span-1}, B_span` at `x`.
    fn basis(&self, span: usize, x: f64) -> [f64; 3] {
        let t = &self.knots;
        let mut n = [1.0, 0.0, 0.0];
        let mut left = [0.0; 3];
        let mut right = [0.0; 3];
        for j in 1..=2 {
            left[j] = x - t[span + 1 - j];
            right[j] = t[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let temp = n[r] / (right[r + 1] + left[j - r]);
                n[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            n[j] = saved;
        }
        n
    }
}

/// Square band matrix solved by Gaussian elimination without pivoting
/// (B-spline collocation matrices are totally positive).
struct BandMatrix {
    n: usize,
    lower: usize,
    upper: usize,
    data: Vec<f64>,
}

impl BandMatrix {
    fn zeros(n: usize, lower: usize, upper: usize) -> Self {
        BandMatrix {
            n,
            lower,
            upper,
            data: vec![0.0; n * (lower + upper + 1)],
        }
    }

    fn idx(&self, row: usize, col: usize) -> usize {
        row * (self.lower + self.upper + 1) + (col + self.lower - row)
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.idx(row, col)]
    }

    fn set(&mut self, row: usize, col: usize, value: f64) {
        let i = self.idx(row, col);
        self.data[i] = value;
    }

    fn solve(mut self, mut rhs: Vec<f64>) -> Result<Vec<f64>> {
        let n = self.n;
        for k in 0..n {
            let pivot = self.get(k, k);
            if pivot.abs() < f64::EPSILON {
                return Err(MatchError::SingularSystem(format!(
                    "zero pivot at row {k} of spline collocation"
                )));
            }
            for i in k + 1..=(k + self.lower).min(n - 1) {
                let factor = self.get(i, k) / pivot;
                if factor == 0.0 {
                    continue;
                }
                for j in k..=(k + self.upper).min(n - 1) {
                    let v = self.get(i, j) - factor * self.get(k, j);
                    self.set(i, j, v);
                }
                rhs[i] -= factor * rhs[k];
            }
        }
        let mut x = vec![0.0; n];
        for k in (0..n).rev() {
            let tail: f64 = (k + 1..=(k + self.upper).min(n - 1))
                .map(|j| self.get(k, j) * x[j])
                .sum();
            x[k] = (rhs[k] - tail) / self.get(k, k);
        }
        Ok(x)
    }
}

// ---------------------------------------------------------------------------
// Savitzky–Golay smoothing
// ---------------------------------------------------------------------------

/// Savitzky–Golay smoother. Interior samples use the least-squares fit
/// evaluated at the window centre; the first and last half-windows are
/// taken from a single fit over the first / last full window.
#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    /// Pseudo-inverse of the centred Vandermonde matrix, `(order+1) x window`.
    projector: DMatrix<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Result<Self> {
        if window % 2 == 0 || window <= order {
            return Err(MatchError::InvalidConfig(format!(
                "window {window} must be odd and exceed order {order}"
            )));
        }
        let half = (window / 2) as f64;
        let vandermonde = DMatrix::from_fn(window, order + 1, |i, j| (i as f64 - half).powi(j as i32));
        let projector = vandermonde
            .pseudo_inverse(1e-12)
            .map_err(|e| MatchError::InvalidConfig(format!("Savitzky-Golay design failed: {e}")))?;
        Ok(SavitzkyGolay {
            window,
            order,
            projector,
        })
    }

    pub fn apply(&self, y: &[f64]) -> Result<Vec<f64>> {
        let n = y.len();
        if n < self.window {
            return Err(MatchError::InvalidConfig(format!(
                "Savitzky-Golay window {} exceeds signal length {n}",
                self.window
            )));
        }
        let half = self.window / 2;
        let centre: Vec<f64> = self.projector.row(0).iter().copied().collect();

        let mut out = vec![0.0; n];
        for i in half..n - half {
            out[i] = centre
                .iter()
                .zip(&y[i - half..=i + half])
                .map(|(c, v)| c * v)
                .sum();
        }

        let head = self.fit(&y[..self.window]);
        let tail = self.fit(&y[n - self.window..]);
        for i in 0..half {
            out[i] = eval_poly(&head, i as f64 - half as f64);
            let offset = (self.window - half + i) as f64 - half as f64;
            out[n - half + i] = eval_poly(&tail, offset);
        }
        Ok(out)
    }

    fn fit(&self, window: &[f64]) -> Vec<f64> {
        (0..=self.order)
            .map(|j| {
                self.projector
                    .row(j)
                    .iter()
                    .zip(window)
                    .map(|(p, v)| p * v)
                    .sum()
            })
            .collect()
    }
}

fn eval_poly(coefficients: &[f64], t: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
}
