//! SQLite-backed store for the bet lifecycle collections
//!
//! Four collections: tracked match state (one row per fixture), unresolved
//! bets (the fixture id is the primary key, so at most one can exist per
//! match), append-only resolved bets, and a key/value config table holding
//! the last-resolution-call marker.
//!
//! Every operation is safe to call against a store that failed to open:
//! reads report absent, writes no-op. The process keeps running on a broken
//! database path instead of crashing at startup.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::warn;

use crate::error::{BotError, Result};
use crate::types::{
    format_timestamp, parse_timestamp, BetOutcome, BetType, ResolvedBet, TrackedState,
    UnresolvedBet,
};


/// Config-collection key for the last successful resolution lookup.
const LAST_RESOLUTION_CALL_KEY: &str = "last_resolution_api_call";

pub struct Database {
    pool: Option<SqlitePool>,
}

impl Database {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(path)?.create_if_missing(true);
        // One connection: an in-memory database opened twice is two databases.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let db = Self { pool: Some(pool) };
        db.init_schema().await?;
        Ok(db)
    }

    /// A store whose every operation no-ops; used when the real store is
    /// unavailable at startup.
    pub fn disabled() -> Self {
        Self { pool: None }
    }

    pub fn is_disabled(&self) -> bool {
        self.pool.is_none()
    }

    async fn init_schema(&self) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tracked_matches (
                fixture_id        INTEGER PRIMARY KEY,
                over_bet_checked  INTEGER NOT NULL DEFAULT 0,
                score_bet_checked INTEGER NOT NULL DEFAULT 0,
                score_bet_target  TEXT
            )",
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS unresolved_bets (
                fixture_id    INTEGER PRIMARY KEY,
                match_name    TEXT NOT NULL,
                league        TEXT NOT NULL,
                country       TEXT NOT NULL,
                league_id     INTEGER NOT NULL,
                bet_type      TEXT NOT NULL,
                trigger_score TEXT NOT NULL,
                over_line     TEXT,
                placed_at     TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS resolved_bets (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                fixture_id    INTEGER NOT NULL,
                match_name    TEXT NOT NULL,
                league        TEXT NOT NULL,
                country       TEXT NOT NULL,
                league_id     INTEGER NOT NULL,
                bet_type      TEXT NOT NULL,
                trigger_score TEXT NOT NULL,
                over_line     TEXT,
                final_score   TEXT NOT NULL,
                outcome       TEXT NOT NULL,
                placed_at     TEXT NOT NULL,
                resolved_at   TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS bot_config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }

    // ---- tracked match state ----

    pub async fn tracked_match(&self, fixture_id: i64) -> Result<Option<TrackedState>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };
        let row = sqlx::query(
            "SELECT over_bet_checked, score_bet_checked, score_bet_target
             FROM tracked_matches WHERE fixture_id = ?",
        )
        .bind(fixture_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|row| TrackedState {
            over_bet_checked: row.get::<i64, _>(0) != 0,
            score_bet_checked: row.get::<i64, _>(1) != 0,
            score_bet_target: row.get(2),
        }))
    }

    pub async fn upsert_tracked_match(&self, fixture_id: i64, state: &TrackedState) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::query(
            "INSERT INTO tracked_matches
                 (fixture_id, over_bet_checked, score_bet_checked, score_bet_target)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(fixture_id) DO UPDATE SET
                 over_bet_checked  = excluded.over_bet_checked,
                 score_bet_checked = excluded.score_bet_checked,
                 score_bet_target  = excluded.score_bet_target",
        )
        .bind(fixture_id)
        .bind(state.over_bet_checked as i64)
        .bind(state.score_bet_checked as i64)
        .bind(&state.score_bet_target)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete_tracked_match(&self, fixture_id: i64) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::query("DELETE FROM tracked_matches WHERE fixture_id = ?")
            .bind(fixture_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    // ---- unresolved bets ----

    pub async fn add_unresolved_bet(&self, bet: &UnresolvedBet) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::query(
            "INSERT OR REPLACE INTO unresolved_bets
                 (fixture_id, match_name, league, country, league_id,
                  bet_type, trigger_score, over_line, placed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bet.fixture_id)
        .bind(&bet.match_name)
        .bind(&bet.league)
        .bind(&bet.country)
        .bind(bet.league_id)
        .bind(bet.bet_type.as_str())
        .bind(&bet.trigger_score)
        .bind(bet.over_line.map(|line| line.to_string()))
        .bind(format_timestamp(bet.placed_at))
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn unresolved_bet(&self, fixture_id: i64) -> Result<Option<UnresolvedBet>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };
        let row = sqlx::query(
            "SELECT fixture_id, match_name, league, country, league_id,
                    bet_type, trigger_score, over_line, placed_at
             FROM unresolved_bets WHERE fixture_id = ?",
        )
        .bind(fixture_id)
        .fetch_optional(pool)
        .await?;
        row.map(|row| row_to_unresolved(&row)).transpose()
    }

    pub async fn unresolved_bets(&self) -> Result<Vec<UnresolvedBet>> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            "SELECT fixture_id, match_name, league, country, league_id,
                    bet_type, trigger_score, over_line, placed_at
             FROM unresolved_bets ORDER BY placed_at",
        )
        .fetch_all(pool)
        .await?;
        Ok(collect_unresolved(rows))
    }

    /// Unresolved bets placed before `cutoff`. A record whose stored fields
    /// no longer parse is skipped with a warning, not failed, so one bad row
    /// can not block the whole sweep.
    pub async fn stale_unresolved_bets(&self, cutoff: DateTime<Utc>) -> Result<Vec<UnresolvedBet>> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            "SELECT fixture_id, match_name, league, country, league_id,
                    bet_type, trigger_score, over_line, placed_at
             FROM unresolved_bets WHERE placed_at < ? ORDER BY placed_at",
        )
        .bind(format_timestamp(cutoff))
        .fetch_all(pool)
        .await?;
        Ok(collect_unresolved(rows))
    }

    /// Atomically copy an unresolved bet into the resolved collection and
    /// delete the unresolved record. If the resolved insert fails, the
    /// transaction rolls back and the unresolved record survives. Returns
    /// whether the move happened.
    pub async fn move_to_resolved(
        &self,
        bet: &UnresolvedBet,
        outcome: BetOutcome,
        final_score: &str,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(pool) = &self.pool else {
            return Ok(false);
        };
        let mut tx = pool.begin().await?;
        sqlx::query(
            "INSERT INTO resolved_bets
                 (fixture_id, match_name, league, country, league_id,
                  bet_type, trigger_score, over_line, final_score, outcome,
                  placed_at, resolved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bet.fixture_id)
        .bind(&bet.match_name)
        .bind(&bet.league)
        .bind(&bet.country)
        .bind(bet.league_id)
        .bind(bet.bet_type.as_str())
        .bind(&bet.trigger_score)
        .bind(bet.over_line.map(|line| line.to_string()))
        .bind(final_score)
        .bind(outcome.as_str())
        .bind(format_timestamp(bet.placed_at))
        .bind(format_timestamp(resolved_at))
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM unresolved_bets WHERE fixture_id = ?")
            .bind(bet.fixture_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    // ---- resolved bets ----

    pub async fn resolved_bets(&self, limit: i64) -> Result<Vec<ResolvedBet>> {
        let Some(pool) = &self.pool else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            "SELECT fixture_id, match_name, league, country, league_id,
                    bet_type, trigger_score, over_line, final_score, outcome,
                    placed_at, resolved_at
             FROM resolved_bets ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        let mut bets = Vec::with_capacity(rows.len());
        for row in rows {
            match row_to_resolved(&row) {
                Ok(bet) => bets.push(bet),
                Err(e) => warn!("Skipping unreadable resolved bet record: {}", e),
            }
        }
        Ok(bets)
    }

    pub async fn resolved_count(&self) -> Result<i64> {
        let Some(pool) = &self.pool else {
            return Ok(0);
        };
        let row = sqlx::query("SELECT COUNT(*) FROM resolved_bets")
            .fetch_one(pool)
            .await?;
        Ok(row.get(0))
    }

    // ---- last-resolution-call marker ----

    /// The persisted marker of the last lookup round. An unparsable value
    /// reads as absent, i.e. "infinitely long ago".
    pub async fn last_resolution_call(&self) -> Result<Option<DateTime<Utc>>> {
        let Some(pool) = &self.pool else {
            return Ok(None);
        };
        let row = sqlx::query("SELECT value FROM bot_config WHERE key = ?")
            .bind(LAST_RESOLUTION_CALL_KEY)
            .fetch_optional(pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.get(0);
        match parse_timestamp(&value) {
            Ok(ts) => Ok(Some(ts)),
            Err(_) => {
                warn!(
                    "Unparsable last-resolution-call marker '{}', treating as absent",
                    value
                );
                Ok(None)
            }
        }
    }

    pub async fn set_last_resolution_call(&self, ts: DateTime<Utc>) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::query("INSERT OR REPLACE INTO bot_config (key, value) VALUES (?, ?)")
            .bind(LAST_RESOLUTION_CALL_KEY)
            .bind(format_timestamp(ts))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Raw statement escape hatch for tests that need to corrupt state.
    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
        let Some(pool) = &self.pool else {
            return Ok(());
        };
        sqlx::query(sql).execute(pool).await?;
        Ok(())
    }
}

fn collect_unresolved(rows: Vec<SqliteRow>) -> Vec<UnresolvedBet> {
    let mut bets = Vec::with_capacity(rows.len());
    for row in rows {
        match row_to_unresolved(&row) {
            Ok(bet) => bets.push(bet),
            Err(e) => warn!("Skipping unreadable unresolved bet record: {}", e),
        }
    }
    bets
}

fn row_to_unresolved(row: &SqliteRow) -> Result<UnresolvedBet> {
    let bet_type_tag: String = row.get("bet_type");
    let bet_type =
        BetType::from_tag(&bet_type_tag).ok_or_else(|| BotError::UnknownTag(bet_type_tag))?;
    let placed_at_raw: String = row.get("placed_at");
    Ok(UnresolvedBet {
        fixture_id: row.get("fixture_id"),
        match_name: row.get("match_name"),
        league: row.get("league"),
        country: row.get("country"),
        league_id: row.get("league_id"),
        bet_type,
        trigger_score: row.get("trigger_score"),
        over_line: row
            .get::<Option<String>, _>("over_line")
            .and_then(|raw| Decimal::from_str(&raw).ok()),
        placed_at: parse_timestamp(&placed_at_raw)?,
    })
}

fn row_to_resolved(row: &SqliteRow) -> Result<ResolvedBet> {
    let bet_type_tag: String = row.get("bet_type");
    let bet_type =
        BetType::from_tag(&bet_type_tag).ok_or_else(|| BotError::UnknownTag(bet_type_tag))?;
    let outcome_tag: String = row.get("outcome");
    let outcome =
        BetOutcome::from_tag(&outcome_tag).ok_or_else(|| BotError::UnknownTag(outcome_tag))?;
    let placed_at_raw: String = row.get("placed_at");
    let resolved_at_raw: String = row.get("resolved_at");
    Ok(ResolvedBet {
        fixture_id: row.get("fixture_id"),
        match_name: row.get("match_name"),
        league: row.get("league"),
        country: row.get("country"),
        league_id: row.get("league_id"),
        bet_type,
        trigger_score: row.get("trigger_score"),
        over_line: row
            .get::<Option<String>, _>("over_line")
            .and_then(|raw| Decimal::from_str(&raw).ok()),
        final_score: row.get("final_score"),
        outcome,
        placed_at: parse_timestamp(&placed_at_raw)?,
        resolved_at: parse_timestamp(&resolved_at_raw)?,
    })
}
