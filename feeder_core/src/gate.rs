//! Range gate with history fallback, and the stability (hysteresis) gate.
use crate::config::Thresholds;
use crate::state::ChannelState;

/// Inclusive envelope check.
#[inline]
pub fn in_range(w: f64, max_weight_g: f64) -> bool {
    (-max_weight_g..=max_weight_g).contains(&w)
}

/// Median of the candidates lying strictly inside the envelope, taken as
/// the element at `len / 2` of the ascending sort (the upper middle for an
/// even count). `None` when no candidate qualifies.
pub fn fallback_median(candidates: &[f64], max_weight_g: f64) -> Option<f64> {
    let mut ok: Vec<f64> = candidates
        .iter()
        .copied()
        .filter(|w| -max_weight_g < *w && *w < max_weight_g)
        .collect();
    if ok.is_empty() {
        return None;
    }
    ok.sort_by(f64::total_cmp);
    Some(ok[ok.len() / 2])
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StabilityOutcome {
    /// New value is visible.
    Pass,
    /// Reading differs from the plateau; the plateau value stays visible.
    Held { stable_weight: f64 },
}

/// Hysteresis gate: a new plateau becomes visible only after
/// `stability_count` consecutive similar readings.
///
/// A reading far from the plateau starts a candidate; later readings are
/// compared against that candidate until it is confirmed or replaced.
/// Returns the visible weight.
pub(crate) fn stability_gate(state: &mut ChannelState, w: f64, th: &Thresholds) -> (f64, StabilityOutcome) {
    let near = |reference: f64| (w - reference).abs() < th.stability_threshold_g;

    if near(state.stable_weight) {
        state.stability_candidate = None;
        state.stability_count = state.stability_count.saturating_add(1);
    } else if state.stability_candidate.is_some_and(near) {
        state.stability_count = state.stability_count.saturating_add(1);
    } else {
        state.stability_candidate = Some(w);
        state.stability_count = 1;
    }
    if state.stability_count >= th.stability_count {
        state.stable_weight = w;
        state.stability_candidate = None;
    }

    if state.stable_weight != 0.0 && state.stability_count < th.stability_count {
        let stable_weight = state.stable_weight;
        (stable_weight, StabilityOutcome::Held { stable_weight })
    } else {
        (w, StabilityOutcome::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(500.0, true)]
    #[case(-500.0, true)]
    #[case(500.5, false)]
    #[case(-501.0, false)]
    fn envelope_is_inclusive(#[case] w: f64, #[case] expected: bool) {
        assert_eq!(in_range(w, 500.0), expected);
    }

    #[test]
    fn median_uses_upper_middle_for_even_counts() {
        assert_eq!(fallback_median(&[10.0, 12.0, 9.0, 11.0, 600.0], 500.0), Some(11.0));
        assert_eq!(fallback_median(&[3.0, 1.0, 2.0], 500.0), Some(2.0));
    }

    #[test]
    fn boundary_values_are_not_fallback_candidates() {
        assert_eq!(fallback_median(&[500.0, -500.0, 700.0], 500.0), None);
        assert_eq!(fallback_median(&[], 500.0), None);
    }

    #[test]
    fn jump_is_held_until_confirmed() {
        let th = Thresholds::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        s.stable_weight = 50.0;
        s.stability_count = 3;

        assert_eq!(stability_gate(&mut s, 80.0, &th).0, 50.0);
        assert_eq!(s.stability_count, 1);
        assert_eq!(s.stability_candidate, Some(80.0));
        assert_eq!(stability_gate(&mut s, 80.0, &th).0, 50.0);
        assert_eq!(s.stability_count, 2);
        assert_eq!(stability_gate(&mut s, 80.0, &th), (80.0, StabilityOutcome::Pass));
        assert_eq!(s.stable_weight, 80.0);
        assert_eq!(s.stability_candidate, None);
    }

    #[test]
    fn a_different_jump_replaces_the_candidate() {
        let th = Thresholds::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        s.stable_weight = 50.0;
        s.stability_count = 3;

        stability_gate(&mut s, 80.0, &th);
        assert_eq!(stability_gate(&mut s, 120.0, &th).0, 50.0);
        assert_eq!((s.stability_count, s.stability_candidate), (1, Some(120.0)));
        stability_gate(&mut s, 122.0, &th);
        assert_eq!(stability_gate(&mut s, 121.0, &th).0, 121.0);
        assert_eq!(s.stable_weight, 121.0);
    }

    #[test]
    fn returning_to_the_plateau_drops_the_candidate() {
        let th = Thresholds::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        s.stable_weight = 50.0;
        s.stability_count = 3;

        stability_gate(&mut s, 80.0, &th);
        assert_eq!(stability_gate(&mut s, 51.0, &th).0, 50.0);
        assert_eq!((s.stability_count, s.stability_candidate), (2, None));
        assert_eq!(stability_gate(&mut s, 80.0, &th).0, 50.0);
        assert_eq!(s.stability_count, 1);
    }

    #[test]
    fn zero_plateau_lets_values_through() {
        let th = Thresholds::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        assert_eq!(stability_gate(&mut s, 42.0, &th), (42.0, StabilityOutcome::Pass));
        assert_eq!(s.stability_count, 1);
        assert_eq!(s.stable_weight, 0.0);
    }

    #[test]
    fn similar_readings_move_the_plateau() {
        let th = Thresholds::default();
        let mut s = ChannelState::new(5, Some(1.0), None);
        for w in [1.0, 2.0, 3.0] {
            stability_gate(&mut s, w, &th);
        }
        assert_eq!(s.stability_count, 3);
        assert_eq!(s.stable_weight, 3.0);
        let (visible, outcome) = stability_gate(&mut s, 4.0, &th);
        assert_eq!((visible, outcome), (4.0, StabilityOutcome::Pass));
        assert_eq!(s.stable_weight, 4.0);
    }
}
