//! Raw sample smoothing: bounded window plus outlier-filtered mean.
use std::collections::VecDeque;

/// Push `raw` into the window, evicting the oldest entries beyond `cap`.
#[inline]
pub fn push_window(window: &mut VecDeque<f64>, raw: f64, cap: usize) {
    window.push_back(raw);
    while window.len() > cap.max(1) {
        window.pop_front();
    }
}

/// Mean of the window entries whose distance from the window mean is
/// strictly below `outlier_threshold`. `None` for an empty window or when
/// every entry is an outlier.
pub fn filtered_mean(window: &VecDeque<f64>, outlier_threshold: f64) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let (sum, n) = window
        .iter()
        .filter(|v| (*v - mean).abs() < outlier_threshold)
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Append `raw` and return the smoothed value for this sample.
///
/// With filtering off the latest raw sample is used as-is.
pub fn smooth(
    window: &mut VecDeque<f64>,
    raw: f64,
    cap: usize,
    outlier_threshold: f64,
    filtering: bool,
) -> f64 {
    push_window(window, raw, cap);
    if !filtering {
        return raw;
    }
    filtered_mean(window, outlier_threshold).unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn win(v: &[f64]) -> VecDeque<f64> {
        v.iter().copied().collect()
    }

    #[test]
    fn window_evicts_oldest_first() {
        let mut w = VecDeque::new();
        for i in 0..8 {
            push_window(&mut w, i as f64, 5);
        }
        assert_eq!(w, win(&[3.0, 4.0, 5.0, 6.0, 7.0]));
    }

    #[test]
    fn spike_is_dropped_from_the_mean() {
        // mean = 1200; 1000s sit 200 away, spike 2000 sits 800 away: all outliers
        let w = win(&[1000.0, 1000.0, 1000.0, 1000.0, 2000.0]);
        assert_eq!(filtered_mean(&w, 100.0), None);
        // tighter cluster: mean = 1020, spike 1100 is 80 away and survives
        let w = win(&[1000.0, 1000.0, 1000.0, 1000.0, 1100.0]);
        assert_eq!(filtered_mean(&w, 100.0), Some(1020.0));
    }

    #[rstest]
    #[case(&[10.0, 20.0, 30.0], 100.0, Some(20.0))]
    #[case(&[0.0, 0.0, 0.0, 0.0, 500.0], 100.0, None)]
    #[case(&[], 100.0, None)]
    fn filtered_mean_cases(#[case] v: &[f64], #[case] thr: f64, #[case] expected: Option<f64>) {
        assert_eq!(filtered_mean(&win(v), thr), expected);
    }

    #[test]
    fn all_outliers_fall_back_to_latest_raw() {
        let mut w = win(&[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(smooth(&mut w, 500.0, 5, 100.0, true), 500.0);
    }

    #[test]
    fn filtering_off_returns_latest_but_still_records() {
        let mut w = win(&[100.0, 200.0]);
        assert_eq!(smooth(&mut w, 300.0, 5, 100.0, false), 300.0);
        assert_eq!(w.len(), 3);
    }
}
