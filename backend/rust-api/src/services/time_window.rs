//! Competition phase classification.
//!
//! Every call recomputes from absolute instants, so callers can re-evaluate
//! on a timer as often as they like without accumulating drift.

use chrono::{DateTime, Utc};

use crate::models::competition::{CompetitionWindow, Phase, Remaining, WindowState};

/// Classifies the competition at `now`.
///
/// The lower bound is inclusive (`now == start` is already active) and the
/// upper bound exclusive (`now == end` has already ended).
pub fn classify(
    now: DateTime<Utc>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> WindowState {
    let Some(start) = start else {
        return WindowState {
            phase: Phase::NotConfigured,
            remaining: None,
        };
    };

    if now < start {
        return WindowState {
            phase: Phase::NotStarted,
            remaining: Some(Remaining::from_duration(start - now)),
        };
    }

    match end {
        None => WindowState {
            phase: Phase::Active,
            remaining: None,
        },
        Some(end) if now < end => WindowState {
            phase: Phase::Active,
            remaining: Some(Remaining::from_duration(end - now)),
        },
        Some(_) => WindowState {
            phase: Phase::Ended,
            remaining: None,
        },
    }
}

pub fn classify_window(now: DateTime<Utc>, window: &CompetitionWindow) -> WindowState {
    classify(now, window.start, window.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_740_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn missing_start_is_not_configured() {
        let state = classify(at(0), None, Some(at(100)));
        assert_eq!(state.phase, Phase::NotConfigured);
        assert!(state.remaining.is_none());
    }

    #[test]
    fn before_start_counts_down_to_start() {
        let now = at(0);
        let state = classify(now, Some(now + Duration::seconds(90_061)), None);
        assert_eq!(state.phase, Phase::NotStarted);
        assert_eq!(
            state.remaining,
            Some(Remaining {
                days: 1,
                hours: 1,
                minutes: 1,
                seconds: 1
            })
        );
    }

    #[test]
    fn start_instant_is_already_active() {
        let state = classify(at(0), Some(at(0)), Some(at(60)));
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(state.remaining.unwrap().total_seconds(), 60);
    }

    #[test]
    fn open_ended_window_has_no_countdown() {
        let state = classify(at(500), Some(at(0)), None);
        assert_eq!(state.phase, Phase::Active);
        assert!(state.remaining.is_none());
    }

    #[test]
    fn active_counts_down_to_end() {
        let state = classify(at(10), Some(at(0)), Some(at(3_725)));
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(
            state.remaining,
            Some(Remaining {
                days: 0,
                hours: 1,
                minutes: 1,
                seconds: 55
            })
        );
    }

    #[test]
    fn end_instant_is_already_ended() {
        let state = classify(at(60), Some(at(0)), Some(at(60)));
        assert_eq!(state.phase, Phase::Ended);
        assert!(state.remaining.is_none());

        let one_ms_before = at(60) - Duration::milliseconds(1);
        assert_eq!(
            classify(one_ms_before, Some(at(0)), Some(at(60))).phase,
            Phase::Active
        );
    }

    #[test]
    fn inverted_window_falls_through_comparisons() {
        // end before start: before start wins, after start is immediately ended
        assert_eq!(
            classify(at(5), Some(at(10)), Some(at(0))).phase,
            Phase::NotStarted
        );
        assert_eq!(
            classify(at(15), Some(at(10)), Some(at(0))).phase,
            Phase::Ended
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let window = CompetitionWindow::new(at(0), Some(at(1_000)));
        let first = classify_window(at(250), &window);
        let second = classify_window(at(250), &window);
        assert_eq!(first, second);
    }

    #[test]
    fn sweep_agrees_with_boundaries() {
        let start = at(100);
        let end = at(200);
        for offset in 0..300 {
            let now = at(offset);
            let phase = classify(now, Some(start), Some(end)).phase;
            let expected = if now < start {
                Phase::NotStarted
            } else if now < end {
                Phase::Active
            } else {
                Phase::Ended
            };
            assert_eq!(phase, expected, "offset {}", offset);
        }
    }
}
