//! Unit tests for trigger detection

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::types::{MatchSnapshot, MatchStatus, TrackedState, TriggerEvent};
    use rust_decimal_macros::dec;

    fn make_snapshot(status: MatchStatus, elapsed: Option<i64>, home: i64, away: i64) -> MatchSnapshot {
        MatchSnapshot {
            fixture_id: 1001,
            match_name: "Alpha FC vs Beta FC".to_string(),
            league_id: 39,
            league_name: "Test League".to_string(),
            country: "Testland".to_string(),
            status,
            elapsed,
            home_goals: home,
            away_goals: away,
        }
    }

    #[test]
    fn test_over_trigger_fires_on_one_nil() {
        let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(32), 1, 0);
        let detection = check_triggers(&snapshot, TrackedState::default());

        match detection {
            Detection::Checked { state, trigger } => {
                assert!(state.over_bet_checked);
                assert_eq!(
                    trigger,
                    Some(TriggerEvent::OverGoals {
                        trigger_score: "1-0".to_string(),
                        line: dec!(2.5),
                    })
                );
            }
            Detection::Skipped => panic!("should have checked the window"),
        }
    }

    #[test]
    fn test_over_trigger_fires_on_nil_one() {
        let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(31), 0, 1);
        let detection = check_triggers(&snapshot, TrackedState::default());

        let Detection::Checked { trigger, .. } = detection else {
            panic!("should have checked the window");
        };
        assert!(matches!(trigger, Some(TriggerEvent::OverGoals { .. })));
    }

    #[test]
    fn test_over_window_consumed_without_qualifying_score() {
        // 1-1 at minute 32: no bet, but the window must still be consumed.
        let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(32), 1, 1);
        let detection = check_triggers(&snapshot, TrackedState::default());

        match detection {
            Detection::Checked { state, trigger } => {
                assert!(state.over_bet_checked);
                assert!(trigger.is_none());
            }
            Detection::Skipped => panic!("should have checked the window"),
        }
    }

    #[test]
    fn test_over_window_fires_at_most_once() {
        let mut state = TrackedState::default();

        // First observation at minute 31 consumes the window.
        let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(31), 1, 0);
        if let Detection::Checked { state: next, trigger } = check_triggers(&snapshot, state) {
            assert!(trigger.is_some());
            state = next;
        } else {
            panic!("should have checked");
        }

        // Later minutes inside the same window must not re-trigger.
        for minute in [32, 33] {
            let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(minute), 1, 0);
            if let Detection::Checked { state: next, trigger } = check_triggers(&snapshot, state) {
                assert!(trigger.is_none(), "minute {} re-triggered", minute);
                state = next;
            } else {
                panic!("should have checked");
            }
        }
    }

    #[test]
    fn test_no_over_trigger_outside_window() {
        for minute in [30, 34, 45] {
            let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(minute), 1, 0);
            let Detection::Checked { state, trigger } =
                check_triggers(&snapshot, TrackedState::default())
            else {
                panic!("live match should be checked");
            };
            assert!(trigger.is_none());
            assert!(!state.over_bet_checked, "minute {} consumed the window", minute);
        }
    }

    #[test]
    fn test_over_window_ignored_in_second_half() {
        // Minute value inside the first-half window but the match is in the
        // second half (e.g. long stoppage time bookkeeping) - no trigger.
        let snapshot = make_snapshot(MatchStatus::SecondHalf, Some(32), 1, 0);
        let Detection::Checked { state, trigger } =
            check_triggers(&snapshot, TrackedState::default())
        else {
            panic!("live match should be checked");
        };
        assert!(trigger.is_none());
        assert!(!state.over_bet_checked);
    }

    #[test]
    fn test_score_trigger_fires_on_two_nil() {
        let snapshot = make_snapshot(MatchStatus::SecondHalf, Some(80), 2, 0);
        let detection = check_triggers(&snapshot, TrackedState::default());

        match detection {
            Detection::Checked { state, trigger } => {
                assert!(state.score_bet_checked);
                assert_eq!(state.score_bet_target, Some("2-0".to_string()));
                assert_eq!(
                    trigger,
                    Some(TriggerEvent::CorrectScore {
                        target_score: "2-0".to_string(),
                    })
                );
            }
            Detection::Skipped => panic!("should have checked the window"),
        }
    }

    #[test]
    fn test_score_trigger_fires_on_three_one() {
        let snapshot = make_snapshot(MatchStatus::SecondHalf, Some(79), 3, 1);
        let Detection::Checked { trigger, .. } =
            check_triggers(&snapshot, TrackedState::default())
        else {
            panic!("should have checked");
        };
        assert!(matches!(trigger, Some(TriggerEvent::CorrectScore { .. })));
    }

    #[test]
    fn test_score_window_consumed_without_qualifying_score() {
        let snapshot = make_snapshot(MatchStatus::SecondHalf, Some(81), 1, 1);
        let Detection::Checked { state, trigger } =
            check_triggers(&snapshot, TrackedState::default())
        else {
            panic!("should have checked");
        };
        assert!(state.score_bet_checked);
        assert!(state.score_bet_target.is_none());
        assert!(trigger.is_none());
    }

    #[test]
    fn test_consumed_flag_is_never_reset() {
        let state = TrackedState {
            over_bet_checked: true,
            score_bet_checked: false,
            score_bet_target: None,
        };
        let snapshot = make_snapshot(MatchStatus::FirstHalf, Some(33), 0, 1);
        let Detection::Checked { state, trigger } = check_triggers(&snapshot, state) else {
            panic!("should have checked");
        };
        assert!(trigger.is_none());
        assert!(state.over_bet_checked);
    }

    #[test]
    fn test_null_elapsed_minute_skips_detection() {
        let snapshot = make_snapshot(MatchStatus::FirstHalf, None, 1, 0);
        assert_eq!(
            check_triggers(&snapshot, TrackedState::default()),
            Detection::Skipped
        );
    }

    #[test]
    fn test_halftime_with_null_elapsed_is_checked_but_quiet() {
        let snapshot = make_snapshot(MatchStatus::Halftime, None, 1, 0);
        let Detection::Checked { state, trigger } =
            check_triggers(&snapshot, TrackedState::default())
        else {
            panic!("halftime should not be skipped");
        };
        assert!(trigger.is_none());
        assert_eq!(state, TrackedState::default());
    }

    #[test]
    fn test_finished_match_skips_detection() {
        for status in [
            MatchStatus::FullTime,
            MatchStatus::AfterExtraTime,
            MatchStatus::AfterPenalties,
            MatchStatus::Other("PST".to_string()),
        ] {
            let snapshot = make_snapshot(status, Some(90), 2, 1);
            assert_eq!(
                check_triggers(&snapshot, TrackedState::default()),
                Detection::Skipped
            );
        }
    }

    #[test]
    fn test_both_windows_independent() {
        // Over window consumed earlier; the late window still fires.
        let state = TrackedState {
            over_bet_checked: true,
            score_bet_checked: false,
            score_bet_target: None,
        };
        let snapshot = make_snapshot(MatchStatus::SecondHalf, Some(80), 3, 1);
        let Detection::Checked { state, trigger } = check_triggers(&snapshot, state) else {
            panic!("should have checked");
        };
        assert!(state.over_bet_checked);
        assert!(state.score_bet_checked);
        assert!(trigger.is_some());
    }
}
