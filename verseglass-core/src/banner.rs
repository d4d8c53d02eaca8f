//! Next-track banner state transitions.
//!
//! The banner is the transient notification shown in the final seconds of a
//! track. Its visibility is a pure function of the remaining time, whether a
//! next track is known, and the previous visibility, so the whole state
//! machine lives here without any timer or UI coupling.

use std::time::Duration;

/// How long before track end the banner becomes visible.
pub const BANNER_LEAD: Duration = Duration::from_secs(10);

/// Decide banner visibility for one playback update.
///
/// Hidden becomes visible only inside the `0 < remaining <= lead` window and
/// only when a next track is known. Visible becomes hidden once the window is
/// left on either side (a seek backwards, or the track actually ending).
#[must_use]
pub fn banner_visible(remaining: Duration, next_known: bool, was_visible: bool) -> bool {
    let in_window = remaining > Duration::ZERO && remaining <= BANNER_LEAD;
    if was_visible {
        in_window
    } else {
        in_window && next_known
    }
}

/// Countdown fill for a visible banner, increasing 0.0 to 1.0 as the track
/// runs out.
#[must_use]
pub fn countdown_progress(remaining: Duration) -> f32 {
    let remaining = remaining.min(BANNER_LEAD);
    let elapsed = BANNER_LEAD - remaining;
    elapsed.as_secs_f32() / BANNER_LEAD.as_secs_f32()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_outside_window() {
        assert!(!banner_visible(Duration::from_millis(12_000), true, false));
        assert!(!banner_visible(Duration::from_millis(12_000), true, true));
    }

    #[test]
    fn test_visible_inside_window_with_next_track() {
        assert!(banner_visible(Duration::from_millis(9_000), true, false));
    }

    #[test]
    fn test_stays_hidden_without_next_track() {
        assert!(!banner_visible(Duration::from_millis(9_000), false, false));
    }

    #[test]
    fn test_hidden_at_exactly_zero_remaining() {
        assert!(!banner_visible(Duration::ZERO, true, false));
        assert!(!banner_visible(Duration::ZERO, true, true));
    }

    #[test]
    fn test_visible_at_window_edge() {
        assert!(banner_visible(BANNER_LEAD, true, false));
    }

    #[test]
    fn test_countdown_progress_values() {
        assert!((countdown_progress(Duration::from_millis(9_000)) - 0.1).abs() < 1e-6);
        assert!((countdown_progress(Duration::from_millis(5_000)) - 0.5).abs() < 1e-6);
        assert!((countdown_progress(Duration::ZERO) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_countdown_progress_monotonic() {
        let mut last = 0.0f32;
        for ms in (0..=10_000).rev().step_by(250) {
            let progress = countdown_progress(Duration::from_millis(ms));
            assert!(progress >= last);
            last = progress;
        }
    }
}
