//! Precision helpers.
//!
//! Deterministic float ordering for sorting and tie-breaking, plus the
//! integral-float check used when canonicalizing identifiers.

use core::cmp::Ordering;

/// Canonicalize a floating-point value for deterministic ordering.
///
/// Rules:
/// - `-0.0` becomes `0.0`
/// - all NaNs become a single canonical NaN
pub fn canonical_f64(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else if v.is_nan() {
        f64::NAN
    } else {
        v
    }
}

/// Deterministic total ordering for floats.
///
/// Prefer this any time you sort floats or pick a nearest hit.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    canonical_f64(a).total_cmp(&canonical_f64(b))
}

/// Returns the integer value of `v` when it is finite, has no fractional part
/// and fits in an `i64`.
pub fn integral_f64(v: f64) -> Option<i64> {
    if !v.is_finite() || v.fract() != 0.0 {
        return None;
    }
    if v < i64::MIN as f64 || v >= i64::MAX as f64 {
        return None;
    }
    Some(canonical_f64(v) as i64)
}

#[cfg(test)]
mod tests {
    use super::{canonical_f64, integral_f64, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn canonicalizes_negative_zero() {
        assert_eq!(canonical_f64(-0.0), 0.0);
        assert_eq!(canonical_f64(0.0), 0.0);
    }

    #[test]
    fn stable_cmp_is_total_and_deterministic() {
        assert_eq!(stable_total_cmp_f64(1.0, 2.0), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(f64::NAN, f64::NAN), Ordering::Equal);
    }

    #[test]
    fn integral_f64_rejects_fractions_and_non_finite() {
        assert_eq!(integral_f64(42.0), Some(42));
        assert_eq!(integral_f64(-7.0), Some(-7));
        assert_eq!(integral_f64(42.5), None);
        assert_eq!(integral_f64(f64::INFINITY), None);
        assert_eq!(integral_f64(f64::NAN), None);
    }
}
