//! Domain alignment between the unknown spectrum and one catalog record.
//!
//! Each pass walks the domain that starts earlier until it reaches the other
//! one's lower bound:
//!
//! * reference starts first – the reference is cut strictly inside the
//!   unknown's range (one extra sample dropped at each end of the walk);
//! * unknown starts first – the unknown keeps one bracketing sample on each
//!   side of the reference range so linear interpolation stays in range.
//!
//! The reference tail is then trimmed to the unknown's maximum. A single
//! pass can leave a one-sample residue on the side it did not walk, so
//! [`align`] always runs two passes.

use std::ops::Range;

use crate::data::model::SpectrumView;
use crate::error::{MatchError, Result};

/// Unknown and reference trimmed to a common domain interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair<'a> {
    pub unknown: SpectrumView<'a>,
    pub reference: SpectrumView<'a>,
}

/// Validate both spectra, run two alignment passes and check the result is
/// usable for interpolating the unknown onto the reference domain.
pub fn align<'a>(unknown: SpectrumView<'a>, reference: SpectrumView<'a>) -> Result<AlignedPair<'a>> {
    unknown.validate()?;
    reference.validate()?;

    let (u, r) = align_pass(unknown, reference);
    let (u, r) = align_pass(u, r);

    if u.len() < 2 || r.len() < 2 {
        return Err(MatchError::AlignmentInvariant(format!(
            "overlap too small: unknown [{}, {}] vs reference [{}, {}] leaves {} / {} samples",
            unknown.x_min(),
            unknown.x_max(),
            reference.x_min(),
            reference.x_max(),
            u.len(),
            r.len()
        )));
    }
    if r.x_min() < u.x_min() || r.x_max() > u.x_max() {
        return Err(MatchError::AlignmentInvariant(format!(
            "reference [{}, {}] escapes unknown [{}, {}]",
            r.x_min(),
            r.x_max(),
            u.x_min(),
            u.x_max()
        )));
    }

    Ok(AlignedPair {
        unknown: u,
        reference: r,
    })
}

/// One trimming pass. Never fails; may return empty views when the domains
/// do not overlap.
pub fn align_pass<'a>(
    unknown: SpectrumView<'a>,
    reference: SpectrumView<'a>,
) -> (SpectrumView<'a>, SpectrumView<'a>) {
    let (u_range, r_range) = pass_ranges(unknown.x, reference.x);
    (unknown.slice(u_range), reference.slice(r_range))
}

fn pass_ranges(x: &[f64], xr: &[f64]) -> (Range<usize>, Range<usize>) {
    let view_min = |v: &[f64]| v.iter().copied().fold(f64::INFINITY, f64::min);
    let view_max = |v: &[f64]| v.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (x_min, x_max) = (view_min(x), view_max(x));
    let (xr_min, xr_max) = (view_min(xr), view_max(xr));

    let mut u_range = 0..x.len();
    let mut r_range = 0..xr.len();
    let mut ii = 0;

    if xr_min < x_min {
        while ii < xr.len() && xr[ii] < x_min {
            ii += 1;
        }
        let start = ii + 1;
        while ii < xr.len() && xr[ii] < x_max {
            ii += 1;
        }
        let end = ii.saturating_sub(1);
        r_range = start.min(end)..end;
    } else {
        while ii < x.len() && x[ii] < xr_min {
            ii += 1;
        }
        let start = ii.saturating_sub(1);
        while ii < x.len() && x[ii] < xr_max {
            ii += 1;
        }
        let end = (ii + 1).min(x.len());
        u_range = start..end;
    }

    // reference tail never exceeds the unknown's maximum
    while r_range.end > r_range.start && xr[r_range.end - 1] > x_max {
        r_range.end -= 1;
    }

    (u_range, r_range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Spectrum;

    fn grid(start: f64, step: f64, n: usize) -> Spectrum {
        let x: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
        let y = x.iter().map(|v| v.sin()).collect();
        Spectrum { x, y }
    }

    #[test]
    fn coinciding_bounds_do_not_trim() {
        let u = grid(0.0, 1.0, 11);
        let r = grid(0.0, 0.5, 21);
        let pair = align(u.view(), r.view()).unwrap();
        assert_eq!(pair.unknown.len(), 11);
        assert_eq!(pair.reference.len(), 21);
    }

    #[test]
    fn reference_starting_first_is_cut_inside() {
        let u = grid(0.0, 1.0, 11);
        let r = grid(-2.5, 1.0, 16);

        let (u1, r1) = align_pass(u.view(), r.view());
        assert_eq!(u1.len(), 11);
        assert_eq!(r1.x.first(), Some(&1.5));
        assert_eq!(r1.x.last(), Some(&8.5));

        let pair = align(u.view(), r.view()).unwrap();
        assert_eq!(pair.reference.x, r1.x);
        assert_eq!(pair.unknown.x.first(), Some(&1.0));
        assert_eq!(pair.unknown.x.last(), Some(&9.0));
    }

    #[test]
    fn unknown_starting_first_keeps_bracketing_samples() {
        let u = grid(0.0, 1.0, 11);
        let r = grid(2.5, 1.0, 7); // 2.5 ..= 8.5
        let pair = align(u.view(), r.view()).unwrap();
        assert_eq!(pair.reference.len(), 7);
        assert_eq!(pair.unknown.x.first(), Some(&2.0));
        assert_eq!(pair.unknown.x.last(), Some(&9.0));
    }

    #[test]
    fn reference_tail_trimmed_to_unknown_max() {
        let u = grid(0.0, 1.0, 11);
        let r = grid(3.25, 0.5, 30); // runs to 17.75
        let pair = align(u.view(), r.view()).unwrap();
        assert!(pair.reference.x_max() <= 10.0);
        assert_eq!(pair.reference.x.last(), Some(&9.75));
    }

    #[test]
    fn overlap_property_on_shifted_grids() {
        for (shift, step_r) in [(0.37, 0.9), (-1.13, 1.1), (4.0, 0.25), (-3.3, 0.7), (0.0, 1.7)] {
            let u = grid(0.0, 0.5, 60);
            let r = grid(shift, step_r, 45);
            let lo = u.view().x_min().max(r.view().x_min());
            let hi = u.view().x_max().min(r.view().x_max());

            let pair = align(u.view(), r.view()).unwrap();
            assert!(pair.unknown.len() <= u.len());
            assert!(pair.reference.len() <= r.len());
            assert!(pair.reference.x_min() >= lo, "shift {shift}");
            assert!(pair.reference.x_max() <= hi, "shift {shift}");
            // Only the reference is held to [lo, hi]. The unknown deliberately
            // keeps one bracketing sample on each side, which may fall outside
            // [lo, hi], so interpolating it onto the reference grid never
            // extrapolates.
            assert!(pair.unknown.x_min() <= pair.reference.x_min());
            assert!(pair.unknown.x_max() >= pair.reference.x_max());
            let n = pair.unknown.len();
            assert!(pair.unknown.x[1] >= pair.reference.x_min());
            assert!(pair.unknown.x[n - 2] <= pair.reference.x_max());
        }
    }

    #[test]
    fn disjoint_domains_fail() {
        let u = grid(0.0, 1.0, 10);
        let r = grid(50.0, 1.0, 10);
        assert!(matches!(
            align(u.view(), r.view()),
            Err(MatchError::AlignmentInvariant(_))
        ));
    }

    #[test]
    fn invalid_domain_rejected_before_trimming() {
        let u = grid(0.0, 1.0, 10);
        let bad = Spectrum {
            x: vec![0.0, 2.0, 1.0],
            y: vec![0.0; 3],
        };
        assert!(matches!(
            align(u.view(), bad.view()),
            Err(MatchError::InvalidDomain(_))
        ));
    }
}
