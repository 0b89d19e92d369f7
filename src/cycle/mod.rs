//! Live polling cycle
//!
//! One cycle fetches every live fixture, runs the trigger detector against
//! each and records any bet that fires. Storage failures for a single match
//! are logged and skipped so the rest of the cycle still runs.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::detector::{self, Detection};
use crate::error::Result;
use crate::feed::FeedClient;
use crate::notify::Notifier;
use crate::storage::Database;
use crate::types::{MatchSnapshot, TriggerEvent, UnresolvedBet};


pub struct LiveCycle {
    feed: Arc<dyn FeedClient>,
    db: Arc<Database>,
    notifier: Arc<Notifier>,
}

impl LiveCycle {
    pub fn new(feed: Arc<dyn FeedClient>, db: Arc<Database>, notifier: Arc<Notifier>) -> Self {
        Self { feed, db, notifier }
    }

    /// Run one detection pass over all live fixtures. Feed failures surface
    /// to the caller; per-match storage failures do not.
    pub async fn run_once(&self) -> Result<()> {
        let matches = self.feed.fetch_live_matches().await?;
        info!("Cycle: {} live matches", matches.len());

        for snapshot in &matches {
            if let Err(e) = self.process_match(snapshot).await {
                warn!(
                    "Skipping fixture {} ({}): {}",
                    snapshot.fixture_id, snapshot.match_name, e
                );
            }
        }
        Ok(())
    }

    async fn process_match(&self, snapshot: &MatchSnapshot) -> Result<()> {
        // Feeds keep listing a match for a short while after full time.
        // Tracked state for it is garbage once no bet is waiting on it.
        if snapshot.status.is_terminal() {
            if self.db.tracked_match(snapshot.fixture_id).await?.is_some()
                && self.db.unresolved_bet(snapshot.fixture_id).await?.is_none()
            {
                debug!(
                    "Cleaning up tracked state for finished fixture {}",
                    snapshot.fixture_id
                );
                self.db.delete_tracked_match(snapshot.fixture_id).await?;
            }
            return Ok(());
        }

        let state = self
            .db
            .tracked_match(snapshot.fixture_id)
            .await?
            .unwrap_or_default();

        match detector::check_triggers(snapshot, state) {
            Detection::Skipped => Ok(()),
            Detection::Checked { state, trigger } => {
                self.db
                    .upsert_tracked_match(snapshot.fixture_id, &state)
                    .await?;
                if let Some(event) = trigger {
                    self.record_bet(snapshot, &event).await?;
                }
                Ok(())
            }
        }
    }

    async fn record_bet(&self, snapshot: &MatchSnapshot, event: &TriggerEvent) -> Result<()> {
        let bet = build_bet(snapshot, event, Utc::now());
        self.db.add_unresolved_bet(&bet).await?;
        info!(
            "Bet placed: {} {} at {} ({})",
            bet.bet_type.as_str(),
            bet.match_name,
            bet.trigger_score,
            bet.league
        );
        self.notifier.bet_placed(&bet).await;
        Ok(())
    }
}

fn build_bet(
    snapshot: &MatchSnapshot,
    event: &TriggerEvent,
    placed_at: chrono::DateTime<Utc>,
) -> UnresolvedBet {
    let (trigger_score, over_line) = match event {
        TriggerEvent::OverGoals {
            trigger_score,
            line,
        } => (trigger_score.clone(), Some(*line)),
        TriggerEvent::CorrectScore { target_score } => (target_score.clone(), None),
    };
    UnresolvedBet {
        fixture_id: snapshot.fixture_id,
        match_name: snapshot.match_name.clone(),
        league: snapshot.league_name.clone(),
        country: snapshot.country.clone(),
        league_id: snapshot.league_id,
        bet_type: event.bet_type(),
        trigger_score,
        over_line,
        placed_at,
    }
}
