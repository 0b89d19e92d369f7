//! Stale-bet resolution
//!
//! Bets older than the staleness threshold are checked against the feed and,
//! once their match has finished, settled and moved to the resolved table.
//! Per-fixture lookups are the expensive feed calls, so a persisted marker
//! rate-limits sweeps that actually hit the provider.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::evaluator;
use crate::feed::FeedClient;
use crate::notify::Notifier;
use crate::storage::Database;
use crate::types::{BetOutcome, UnresolvedBet};

#[cfg(test)]
mod tests;

/// A bet becomes eligible for resolution this many minutes after placement.
pub const STALE_WAIT_MINUTES: i64 = 20;
/// Minimum spacing between sweeps that call the feed.
pub const RESOLUTION_CALL_INTERVAL_SECS: i64 = 900;
/// Pause between per-fixture feed lookups inside one sweep.
const RESOLUTION_PAUSE: Duration = Duration::from_secs(1);

pub struct StaleResolver {
    feed: Arc<dyn FeedClient>,
    db: Arc<Database>,
    notifier: Arc<Notifier>,
    resolution_pause: Duration,
}

impl StaleResolver {
    pub fn new(feed: Arc<dyn FeedClient>, db: Arc<Database>, notifier: Arc<Notifier>) -> Self {
        Self {
            feed,
            db,
            notifier,
            resolution_pause: RESOLUTION_PAUSE,
        }
    }

    #[cfg(test)]
    pub fn with_resolution_pause(mut self, pause: Duration) -> Self {
        self.resolution_pause = pause;
        self
    }

    /// Resolve every sufficiently old unresolved bet whose match has
    /// finished. The rate marker only advances when at least one feed
    /// lookup succeeded, so an outage does not push the next sweep out.
    pub async fn sweep(&self) -> Result<()> {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::minutes(STALE_WAIT_MINUTES);
        let stale = self.db.stale_unresolved_bets(cutoff).await?;
        if stale.is_empty() {
            return Ok(());
        }

        if let Some(last_call) = self.db.last_resolution_call().await? {
            let since = (now - last_call).num_seconds();
            if since < RESOLUTION_CALL_INTERVAL_SECS {
                debug!(
                    "Resolution rate gate: last call {}s ago, waiting {}s",
                    since, RESOLUTION_CALL_INTERVAL_SECS
                );
                return Ok(());
            }
        }

        info!("Resolving {} stale bets", stale.len());
        let mut any_fetch_succeeded = false;

        for bet in &stale {
            match self.feed.fetch_fixture_by_id(bet.fixture_id).await {
                Ok(Some(snapshot)) => {
                    any_fetch_succeeded = true;
                    if snapshot.status.is_terminal() {
                        self.settle(bet, &snapshot.score()).await;
                    } else {
                        debug!(
                            "Fixture {} still {} ({}), leaving bet",
                            bet.fixture_id,
                            snapshot.status.as_short(),
                            snapshot.score()
                        );
                    }
                }
                Ok(None) => {
                    any_fetch_succeeded = true;
                    warn!("Fixture {} unknown to the feed, leaving bet", bet.fixture_id);
                }
                Err(e) => {
                    warn!("Fixture {} lookup failed: {}", bet.fixture_id, e);
                }
            }

            if !self.resolution_pause.is_zero() {
                tokio::time::sleep(self.resolution_pause).await;
            }
        }

        if any_fetch_succeeded {
            self.db.set_last_resolution_call(Utc::now()).await?;
        }
        Ok(())
    }

    /// Settle one bet against the final score. Storage failures here are
    /// logged and leave the record unresolved for the next sweep.
    async fn settle(&self, bet: &UnresolvedBet, final_score: &str) {
        let outcome = evaluator::evaluate(bet, final_score);
        if outcome == BetOutcome::Error {
            warn!(
                "Cannot settle fixture {}: unusable final score {:?}",
                bet.fixture_id, final_score
            );
            self.notifier
                .error(
                    "Bet resolution failed",
                    &format!("{}: unusable final score {:?}", bet.match_name, final_score),
                )
                .await;
            return;
        }

        info!(
            "Resolved: {} {} final {} -> {}",
            bet.bet_type.as_str(),
            bet.match_name,
            final_score,
            outcome.as_str()
        );
        // Notification is best effort and never blocks the migration.
        self.notifier.bet_resolved(bet, outcome, final_score).await;

        match self
            .db
            .move_to_resolved(bet, outcome, final_score, Utc::now())
            .await
        {
            Ok(true) => {
                if let Err(e) = self.db.delete_tracked_match(bet.fixture_id).await {
                    warn!(
                        "Resolved fixture {} but could not drop tracked state: {}",
                        bet.fixture_id, e
                    );
                }
            }
            Ok(false) => {
                warn!(
                    "Store unavailable, fixture {} stays unresolved",
                    bet.fixture_id
                );
            }
            Err(e) => {
                warn!(
                    "Could not migrate fixture {} to resolved: {}",
                    bet.fixture_id, e
                );
            }
        }
    }
}
