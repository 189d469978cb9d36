use crate::error::{MatchError, Result};

// ---------------------------------------------------------------------------
// Resampling
// ---------------------------------------------------------------------------

/// Linear interpolation of `(x, y)` at every point of `at`.
///
/// `x` must be strictly increasing. Points outside `[x[0], x[n-1]]` are an
/// alignment contract violation; nothing is extrapolated.
pub fn interpolate(x: &[f64], y: &[f64], at: &[f64]) -> Result<Vec<f64>> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(MatchError::InvalidDomain(format!(
            "cannot interpolate over {} domain / {} intensity samples",
            x.len(),
            y.len()
        )));
    }
    let lo = x[0];
    let hi = x[x.len() - 1];

    at.iter()
        .map(|&t| {
            if !(lo..=hi).contains(&t) {
                return Err(MatchError::AlignmentInvariant(format!(
                    "resample point {t} outside source domain [{lo}, {hi}]"
                )));
            }
            // first index with x > t, kept inside 1..n so [j-1, j] is a segment
            let j = x.partition_point(|&v| v <= t).clamp(1, x.len() - 1);
            let (x0, x1) = (x[j - 1], x[j]);
            let frac = (t - x0) / (x1 - x0);
            Ok(y[j - 1] * (1.0 - frac) + y[j] * frac)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation coefficient, clamped to `[-1, 1]`.
pub fn pearson(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(MatchError::DegenerateSignal(format!(
            "length mismatch {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let n = a.len();
    if n < 2 {
        return Err(MatchError::DegenerateSignal(format!(
            "correlation needs at least 2 points, got {n}"
        )));
    }

    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (p, q) in a.iter().zip(b) {
        let da = p - mean_a;
        let db = q - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return Err(MatchError::DegenerateSignal("zero-variance signal".into()));
    }
    let r = cov / (var_a * var_b).sqrt();
    if !r.is_finite() {
        return Err(MatchError::DegenerateSignal(format!("correlation evaluated to {r}")));
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Resample the unknown `(x, y)` onto the reference domain `xr` and
/// correlate with the reference intensities `yr`.
pub fn score(x: &[f64], y: &[f64], xr: &[f64], yr: &[f64]) -> Result<f64> {
    let resampled = interpolate(x, y, xr)?;
    pearson(&resampled, yr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<f64> {
        (0..n).map(|k| k as f64 * 0.5).collect()
    }

    #[test]
    fn interpolation_hits_knots_and_midpoints() {
        let x = [0.0, 1.0, 3.0];
        let y = [0.0, 2.0, 6.0];
        let v = interpolate(&x, &y, &[0.0, 0.5, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(v, vec![0.0, 1.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn out_of_range_resampling_is_a_contract_violation() {
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, 1.0, 1.0];
        let err = interpolate(&x, &y, &[2.5]).unwrap_err();
        assert!(matches!(err, MatchError::AlignmentInvariant(_)));
        assert!(interpolate(&x, &y, &[-0.1]).is_err());
    }

    #[test]
    fn self_correlation_is_one() {
        let x = grid(64);
        let y: Vec<f64> = x.iter().map(|v| (v * 0.7).sin() + 0.1 * v).collect();
        assert_eq!(score(&x, &y, &x, &y).unwrap(), 1.0);
    }

    #[test]
    fn positive_scaling_and_negation() {
        let x = grid(64);
        let y: Vec<f64> = x.iter().map(|v| (v * 0.3).cos()).collect();
        let scaled: Vec<f64> = y.iter().map(|v| 7.5 * v).collect();
        let negated: Vec<f64> = y.iter().map(|v| -2.0 * v).collect();
        assert!((score(&x, &y, &x, &scaled).unwrap() - 1.0).abs() < 1e-12);
        assert!((score(&x, &y, &x, &negated).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn flat_signal_is_degenerate() {
        let x = grid(10);
        let y: Vec<f64> = x.clone();
        let err = pearson(&y, &[0.0; 10]).unwrap_err();
        assert!(matches!(err, MatchError::DegenerateSignal(_)));
        assert!(pearson(&[1.0], &[1.0]).is_err());
    }
}
