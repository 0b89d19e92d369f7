//! Core domain types for the bet lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};

/// Layout for every persisted timestamp: UTC, second precision,
/// lexicographically sortable.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    chrono::NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| BotError::MalformedTimestamp(s.to_string()))
}

/// Split a `"home-away"` score string into goal counts.
pub fn parse_score(score: &str) -> Option<(i64, i64)> {
    let (home, away) = score.split_once('-')?;
    Some((home.trim().parse().ok()?, away.trim().parse().ok()?))
}

/// Match phase as reported by the provider's short status codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    FirstHalf,
    Halftime,
    SecondHalf,
    ExtraTime,
    PenaltyShootout,
    /// Generic in-play marker some competitions report instead of a half.
    Live,
    FullTime,
    AfterExtraTime,
    AfterPenalties,
    Other(String),
}

impl MatchStatus {
    pub fn from_short(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "1H" => MatchStatus::FirstHalf,
            "HT" => MatchStatus::Halftime,
            "2H" => MatchStatus::SecondHalf,
            "ET" => MatchStatus::ExtraTime,
            "P" => MatchStatus::PenaltyShootout,
            "LIVE" => MatchStatus::Live,
            "FT" => MatchStatus::FullTime,
            "AET" => MatchStatus::AfterExtraTime,
            "PEN" => MatchStatus::AfterPenalties,
            other => MatchStatus::Other(other.to_string()),
        }
    }

    pub fn as_short(&self) -> &str {
        match self {
            MatchStatus::FirstHalf => "1H",
            MatchStatus::Halftime => "HT",
            MatchStatus::SecondHalf => "2H",
            MatchStatus::ExtraTime => "ET",
            MatchStatus::PenaltyShootout => "P",
            MatchStatus::Live => "LIVE",
            MatchStatus::FullTime => "FT",
            MatchStatus::AfterExtraTime => "AET",
            MatchStatus::AfterPenalties => "PEN",
            MatchStatus::Other(code) => code,
        }
    }

    /// In-play statuses, halftime excluded.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            MatchStatus::FirstHalf
                | MatchStatus::SecondHalf
                | MatchStatus::ExtraTime
                | MatchStatus::PenaltyShootout
                | MatchStatus::Live
        )
    }

    pub fn is_halftime(&self) -> bool {
        matches!(self, MatchStatus::Halftime)
    }

    /// Play has concluded: full time, after extra time, after penalties.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchStatus::FullTime | MatchStatus::AfterExtraTime | MatchStatus::AfterPenalties
        )
    }
}

/// The closed bet catalog. Tags match the stored record format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetType {
    /// First-half trigger (minute 31-33): total goals over a fixed line.
    #[serde(rename = "32_over")]
    OverGoals,
    /// Second-half trigger (minute 79-81): the current score held to full time.
    #[serde(rename = "80_minute")]
    CorrectScore,
}

impl BetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::OverGoals => "32_over",
            BetType::CorrectScore => "80_minute",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "32_over" => Some(BetType::OverGoals),
            "80_minute" => Some(BetType::CorrectScore),
            _ => None,
        }
    }
}

/// Settlement result for a resolved bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Loss,
    /// The realized total landed exactly on the wagered line (void bet).
    Push,
    /// The final score could not be interpreted; the record stays unresolved
    /// for inspection.
    Error,
}

impl BetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetOutcome::Win => "win",
            BetOutcome::Loss => "loss",
            BetOutcome::Push => "push",
            BetOutcome::Error => "error",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "win" => Some(BetOutcome::Win),
            "loss" => Some(BetOutcome::Loss),
            "push" => Some(BetOutcome::Push),
            "error" => Some(BetOutcome::Error),
            _ => None,
        }
    }
}

/// One provider-reported record of a live or finished fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    pub fixture_id: i64,
    pub match_name: String,
    pub league_id: i64,
    pub league_name: String,
    pub country: String,
    pub status: MatchStatus,
    /// Elapsed minute; feeds report null during halftime and occasionally
    /// for matches that just went live.
    pub elapsed: Option<i64>,
    pub home_goals: i64,
    pub away_goals: i64,
}

impl MatchSnapshot {
    pub fn score(&self) -> String {
        format!("{}-{}", self.home_goals, self.away_goals)
    }
}

/// Per-match trigger bookkeeping. A checked flag, once set, is never reset
/// for that match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedState {
    pub over_bet_checked: bool,
    pub score_bet_checked: bool,
    /// The score the correct-score bet locked in, when one fired.
    pub score_bet_target: Option<String>,
}

/// A trigger the detector fired for the current snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerEvent {
    OverGoals { trigger_score: String, line: Decimal },
    CorrectScore { target_score: String },
}

impl TriggerEvent {
    pub fn bet_type(&self) -> BetType {
        match self {
            TriggerEvent::OverGoals { .. } => BetType::OverGoals,
            TriggerEvent::CorrectScore { .. } => BetType::CorrectScore,
        }
    }
}

/// A provisional bet awaiting full-time resolution. At most one exists per
/// fixture at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedBet {
    pub fixture_id: i64,
    pub match_name: String,
    pub league: String,
    pub country: String,
    pub league_id: i64,
    pub bet_type: BetType,
    /// Score observed when the trigger fired; for correct-score bets this is
    /// also the settlement target.
    pub trigger_score: String,
    /// Goal line for over bets, absent for correct-score bets.
    pub over_line: Option<Decimal>,
    pub placed_at: DateTime<Utc>,
}

/// Append-only copy of a settled bet. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBet {
    pub fixture_id: i64,
    pub match_name: String,
    pub league: String,
    pub country: String,
    pub league_id: i64,
    pub bet_type: BetType,
    pub trigger_score: String,
    pub over_line: Option<Decimal>,
    pub final_score: String,
    pub outcome: BetOutcome,
    pub placed_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}
