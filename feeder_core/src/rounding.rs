/// Snap readings inside the dead band to exactly zero.
#[inline]
pub fn snap(w: f64, zero_threshold_g: f64) -> f64 {
    if w.abs() < zero_threshold_g { 0.0 } else { w }
}

/// Display rounding: one decimal below 100 g, whole grams above.
///
/// Halves round away from zero.
#[inline]
pub fn round_weight(w: f64) -> f64 {
    if w.abs() < 100.0 {
        (w * 10.0).round() / 10.0
    } else {
        w.round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2.99, 0.0)]
    #[case(-2.99, 0.0)]
    #[case(3.0, 3.0)]
    #[case(-3.0, -3.0)]
    #[case(0.0, 0.0)]
    fn snap_cases(#[case] w: f64, #[case] expected: f64) {
        assert_eq!(snap(w, 3.0), expected);
    }

    #[test]
    fn snapped_value_is_positive_zero() {
        assert!(snap(-1.0, 3.0).is_sign_positive());
    }

    #[rstest]
    #[case(12.34, 12.3)]
    #[case(-45.67, -45.7)]
    #[case(99.94, 99.9)]
    #[case(100.4, 100.0)]
    #[case(250.5, 251.0)]
    #[case(-300.6, -301.0)]
    fn round_cases(#[case] w: f64, #[case] expected: f64) {
        assert_eq!(round_weight(w), expected);
    }
}
