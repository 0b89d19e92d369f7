//! Outcome evaluation
//!
//! Pure total function settling a bet against the final score. Malformed
//! input maps to [`BetOutcome::Error`] rather than panicking, so a bad feed
//! value never takes down a resolution sweep.

use rust_decimal::Decimal;

use crate::types::{parse_score, BetOutcome, BetType, UnresolvedBet};


/// Settle a bet record against the authoritative final score.
pub fn evaluate(bet: &UnresolvedBet, final_score: &str) -> BetOutcome {
    match bet.bet_type {
        BetType::CorrectScore => evaluate_correct_score(&bet.trigger_score, final_score),
        BetType::OverGoals => match bet.over_line {
            Some(line) => evaluate_over_goals(line, final_score),
            // A record without its line cannot be settled; flag it.
            None => BetOutcome::Error,
        },
    }
}

/// Win iff the final score equals the locked-in target exactly.
pub fn evaluate_correct_score(target: &str, final_score: &str) -> BetOutcome {
    if final_score == target {
        BetOutcome::Win
    } else {
        BetOutcome::Loss
    }
}

/// Win if total goals strictly exceed the line, loss if strictly below,
/// push on exact equality. The line is a half-integer in practice, so
/// equality only arises from unusual input, but it is a defined case.
pub fn evaluate_over_goals(line: Decimal, final_score: &str) -> BetOutcome {
    let Some((home, away)) = parse_score(final_score) else {
        return BetOutcome::Error;
    };
    let total = Decimal::from(home + away);
    if total > line {
        BetOutcome::Win
    } else if total < line {
        BetOutcome::Loss
    } else {
        BetOutcome::Push
    }
}
