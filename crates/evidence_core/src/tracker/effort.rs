//! Effort and progress curves.
//!
//! The two signals are computed from disjoint inputs: effort from session
//! volume only, progress from benchmark readings only.

use super::breaking_point::{EFFORT_CEILING, PROGRESS_RESOLVED};
use crate::config::EffortConfig;

/// Effort for `sessions` completed sessions with the default curve:
/// 5 points per session, saturating at 150.
pub fn calculate_effort_from_sessions(sessions: u32) -> u8 {
    effort_from_sessions(&EffortConfig::default(), sessions)
}

pub fn effort_from_sessions(config: &EffortConfig, sessions: u32) -> u8 {
    let ceiling = config.max_effort_percent.min(EFFORT_CEILING);
    let raw = u64::from(sessions) * u64::from(config.effort_per_session);
    u8::try_from(raw.min(u64::from(ceiling))).unwrap_or(ceiling)
}

/// Share of the baseline-to-target distance covered by `value`, in percent.
///
/// Direction comes from the sign of `target - baseline`, so the same formula
/// serves higher- and lower-is-better tests. `None` when the distance is zero
/// or an input is not finite.
pub fn gap_closed_percent(baseline: f64, target: f64, value: f64) -> Option<f64> {
    let span = target - baseline;
    if !span.is_finite() || !value.is_finite() || span == 0.0 {
        return None;
    }
    Some(((value - baseline) / span * 100.0).clamp(0.0, 100.0))
}

/// Progress a non-passing reading may claim: never below `existing`, never
/// above `cap`. Only a passing evaluation reaches [`PROGRESS_RESOLVED`].
pub fn unresolved_progress(existing: u8, gap_closed: Option<f64>, cap: u8) -> u8 {
    let cap = cap.min(PROGRESS_RESOLVED - 1);
    let scaled = gap_closed.map(|percent| percent.round().clamp(0.0, f64::from(cap)) as u8).unwrap_or(0);
    existing.max(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_effort_curve() {
        assert_eq!(calculate_effort_from_sessions(0), 0);
        assert_eq!(calculate_effort_from_sessions(1), 5);
        assert_eq!(calculate_effort_from_sessions(20), 100);
        assert_eq!(calculate_effort_from_sessions(30), 150);
        assert_eq!(calculate_effort_from_sessions(100), 150);
        assert_eq!(calculate_effort_from_sessions(u32::MAX), 150);
    }

    #[test]
    fn test_effort_curve_respects_config() {
        let config = EffortConfig { effort_per_session: 10, max_effort_percent: 100 };
        assert_eq!(effort_from_sessions(&config, 7), 70);
        assert_eq!(effort_from_sessions(&config, 50), 100);
    }

    #[test]
    fn test_gap_closed_both_directions() {
        assert_eq!(gap_closed_percent(200.0, 220.0, 210.0), Some(50.0));
        // lower is better: 800s -> 700s target
        assert_eq!(gap_closed_percent(800.0, 700.0, 750.0), Some(50.0));
        assert_eq!(gap_closed_percent(200.0, 220.0, 190.0), Some(0.0));
        assert_eq!(gap_closed_percent(200.0, 220.0, 240.0), Some(100.0));
        assert_eq!(gap_closed_percent(200.0, 200.0, 240.0), None);
    }

    #[test]
    fn test_unresolved_progress_never_regresses_or_completes() {
        assert_eq!(unresolved_progress(40, Some(25.0), 99), 40);
        assert_eq!(unresolved_progress(40, Some(60.4), 99), 60);
        assert_eq!(unresolved_progress(40, Some(100.0), 99), 99);
        assert_eq!(unresolved_progress(10, None, 99), 10);
        assert_eq!(unresolved_progress(0, Some(100.0), 100), 99);
    }

    proptest! {
        #[test]
        fn prop_effort_monotonic_and_bounded(a in 0u32..10_000, b in 0u32..10_000) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(calculate_effort_from_sessions(low) <= calculate_effort_from_sessions(high));
            prop_assert!(calculate_effort_from_sessions(high) <= EFFORT_CEILING);
        }

        #[test]
        fn prop_progress_never_regresses(
            existing in 0u8..=99,
            baseline in -500.0f64..500.0,
            target in -500.0f64..500.0,
            value in -1000.0f64..1000.0,
        ) {
            let next = unresolved_progress(existing, gap_closed_percent(baseline, target, value), 99);
            prop_assert!(next >= existing);
            prop_assert!(next < PROGRESS_RESOLVED);
        }
    }
}
