//! Trigger detection
//!
//! Pure state machine mapping (match snapshot, tracked state) to an updated
//! state and at most one trigger event. Each trigger window is evaluated at
//! most once per match: the first observed minute inside the window consumes
//! the window's flag whether or not the score qualifies. No I/O happens here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{MatchSnapshot, MatchStatus, TrackedState, TriggerEvent};

#[cfg(test)]
mod tests;

/// Elapsed minutes at which the first-half over check runs.
pub const OVER_TRIGGER_MINUTES: [i64; 3] = [31, 32, 33];
/// Elapsed minutes at which the late correct-score check runs.
pub const SCORE_TRIGGER_MINUTES: [i64; 3] = [79, 80, 81];
/// Fixed goal line for the first-half over bet.
pub const OVER_LINE: Decimal = dec!(2.5);

/// One-goal scores at the first-half window that qualify for the over bet.
const OVER_QUALIFYING_SCORES: [&str; 2] = ["0-1", "1-0"];
/// Scores at the late window worth locking in as a correct-score bet.
const SCORE_QUALIFYING_SCORES: [&str; 2] = ["3-1", "2-0"];

/// Result of running the detector against one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// The feed entry is not in a recognisable live phase, or reports no
    /// elapsed minute outside halftime; tracked state must be left untouched.
    Skipped,
    /// A check ran. The updated state must be written back whether or not a
    /// trigger fired.
    Checked {
        state: TrackedState,
        trigger: Option<TriggerEvent>,
    },
}

/// Evaluate the trigger windows for one live match.
pub fn check_triggers(snapshot: &MatchSnapshot, state: TrackedState) -> Detection {
    if !snapshot.status.is_live() && !snapshot.status.is_halftime() {
        return Detection::Skipped;
    }
    // Guards against feed entries carrying a null clock; only halftime is
    // expected to report one.
    if snapshot.elapsed.is_none() && !snapshot.status.is_halftime() {
        return Detection::Skipped;
    }

    let minute = snapshot.elapsed.unwrap_or(0);
    let mut state = state;
    let mut trigger = None;

    if snapshot.status == MatchStatus::FirstHalf
        && OVER_TRIGGER_MINUTES.contains(&minute)
        && !state.over_bet_checked
    {
        // Window consumed regardless of whether the score qualifies.
        state.over_bet_checked = true;
        let score = snapshot.score();
        if OVER_QUALIFYING_SCORES.contains(&score.as_str()) {
            trigger = Some(TriggerEvent::OverGoals {
                trigger_score: score,
                line: OVER_LINE,
            });
        }
    } else if snapshot.status == MatchStatus::SecondHalf
        && SCORE_TRIGGER_MINUTES.contains(&minute)
        && !state.score_bet_checked
    {
        state.score_bet_checked = true;
        let score = snapshot.score();
        if SCORE_QUALIFYING_SCORES.contains(&score.as_str()) {
            state.score_bet_target = Some(score.clone());
            trigger = Some(TriggerEvent::CorrectScore {
                target_score: score,
            });
        }
    }

    Detection::Checked { state, trigger }
}
