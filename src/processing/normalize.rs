//! Intensity normalization applied to both signals before scoring.
//!
//! ```text
//!   1. floor clamp   y ← y - min(y)                      (min becomes 0)
//!   2. relaxation    y ← y² / mean(y), repeated n times  (skipped if mean = 0)
//!   3. unit scale    y ← y / max(y)                      (skipped if max = 0)
//! ```
//!
//! Relaxation sharpens dominant peaks against a flat background. It is
//! intentionally non-linear, so two signals that are exact negatives do not
//! map to a correlation of -1 once it has run.

/// Shift so the minimum is exactly zero.
pub fn floor_clamp(y: &mut [f64]) {
    let min = y.iter().copied().fold(f64::INFINITY, f64::min);
    if min.is_finite() {
        y.iter_mut().for_each(|v| *v -= min);
    }
}

/// One relaxation pass: `y² / mean(y)`.
pub fn relax(y: &mut [f64]) {
    if y.is_empty() {
        return;
    }
    let mean = y.iter().sum::<f64>() / y.len() as f64;
    if mean == 0.0 {
        return;
    }
    y.iter_mut().for_each(|v| *v = *v * *v / mean);
}

/// Divide by the maximum so the peak is 1.
pub fn unit_scale(y: &mut [f64]) {
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 && max.is_finite() {
        y.iter_mut().for_each(|v| *v /= max);
    }
}

/// Full normalization with `passes` relaxation rounds.
pub fn normalize(y: &[f64], passes: usize) -> Vec<f64> {
    let mut out = y.to_vec();
    floor_clamp(&mut out);
    for _ in 0..passes {
        relax(&mut out);
    }
    unit_scale(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::similarity::pearson;

    #[test]
    fn result_spans_zero_to_one() {
        let y: Vec<f64> = (0..50).map(|k| (k as f64 / 7.0).sin() * 3.0 - 10.0).collect();
        for passes in 0..3 {
            let n = normalize(&y, passes);
            let min = n.iter().copied().fold(f64::INFINITY, f64::min);
            let max = n.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(min, 0.0);
            assert!((max - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn single_pass_on_ramp() {
        assert_eq!(normalize(&[0.0, 1.0, 2.0], 1), vec![0.0, 0.25, 1.0]);
        assert_eq!(normalize(&[5.0, 6.0, 7.0], 0), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn flat_signal_stays_zero() {
        assert_eq!(normalize(&[4.0; 6], 1), vec![0.0; 6]);
    }

    #[test]
    fn relaxation_breaks_negative_symmetry() {
        // four whole periods: clamp maps y to 1 + sin and -y to 1 - sin
        let y: Vec<f64> = (0..400)
            .map(|k| (2.0 * std::f64::consts::PI * k as f64 / 100.0).sin())
            .collect();
        let neg: Vec<f64> = y.iter().map(|v| -v).collect();

        let linear = pearson(&normalize(&y, 0), &normalize(&neg, 0)).unwrap();
        assert!((linear + 1.0).abs() < 1e-9);

        // (1 ± s)² share the constant and s² terms, only the 2s term flips
        let relaxed = pearson(&normalize(&y, 1), &normalize(&neg, 1)).unwrap();
        assert!((relaxed - (-1.875 / 2.125)).abs() < 1e-6, "relaxed {relaxed}");
    }
}
