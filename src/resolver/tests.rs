//! Unit tests for the stale-bet resolver

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::BotError;
    use crate::feed::MockFeedClient;
    use crate::types::{BetType, MatchSnapshot, MatchStatus, TrackedState};
    use chrono::{DateTime, Duration as ChronoDuration};
    use rust_decimal_macros::dec;

    fn make_bet(fixture_id: i64, age_minutes: i64) -> UnresolvedBet {
        UnresolvedBet {
            fixture_id,
            match_name: "Alpha FC vs Beta FC".to_string(),
            league: "Premier League".to_string(),
            country: "England".to_string(),
            league_id: 39,
            bet_type: BetType::OverGoals,
            trigger_score: "1-0".to_string(),
            over_line: Some(dec!(2.5)),
            placed_at: Utc::now() - ChronoDuration::minutes(age_minutes),
        }
    }

    fn finished_snapshot(fixture_id: i64, home: i64, away: i64) -> MatchSnapshot {
        MatchSnapshot {
            fixture_id,
            match_name: "Alpha FC vs Beta FC".to_string(),
            league_id: 39,
            league_name: "Premier League".to_string(),
            country: "England".to_string(),
            status: MatchStatus::FullTime,
            elapsed: Some(90),
            home_goals: home,
            away_goals: away,
        }
    }

    async fn memory_db() -> Arc<Database> {
        Arc::new(Database::connect("sqlite::memory:").await.unwrap())
    }

    fn make_resolver(feed: MockFeedClient, db: Arc<Database>) -> StaleResolver {
        StaleResolver::new(Arc::new(feed), db, Arc::new(Notifier::disabled()))
            .with_resolution_pause(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_finished_match_settles_and_migrates() {
        let db = memory_db().await;
        let bet = make_bet(1, 30);
        db.add_unresolved_bet(&bet).await.unwrap();
        db.upsert_tracked_match(1, &TrackedState::default())
            .await
            .unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id()
            .times(1)
            .returning(|_| Ok(Some(finished_snapshot(1, 2, 1))));
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_none());
        assert!(db.tracked_match(1).await.unwrap().is_none());
        let resolved = db.resolved_bets(10).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].outcome, BetOutcome::Win);
        assert_eq!(resolved[0].final_score, "2-1");
        assert!(db.last_resolution_call().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_young_bet_triggers_no_feed_call() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 5)).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id().times(0);
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_some());
        assert!(db.last_resolution_call().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rate_gate_blocks_recent_sweep() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 30)).await.unwrap();
        db.set_last_resolution_call(Utc::now() - ChronoDuration::minutes(5))
            .await
            .unwrap();
        let marker_before = db.last_resolution_call().await.unwrap().unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id().times(0);
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_some());
        // A gated skip must not advance the marker.
        assert_eq!(
            db.last_resolution_call().await.unwrap(),
            Some(marker_before)
        );
    }

    #[tokio::test]
    async fn test_expired_gate_allows_sweep() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 60)).await.unwrap();
        let old_marker = Utc::now() - ChronoDuration::minutes(16);
        db.set_last_resolution_call(old_marker).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id()
            .times(1)
            .returning(|_| Ok(Some(finished_snapshot(1, 0, 0))));
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_none());
        let marker = db.last_resolution_call().await.unwrap().unwrap();
        assert!(marker > old_marker);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_bet_and_marker() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 30)).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id().times(1).returning(|_| {
            Err(BotError::FeedStatus {
                status: 500,
                body: "boom".to_string(),
            })
        });
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_some());
        // No fetch succeeded, so the marker must not advance.
        assert!(db.last_resolution_call().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_fixture_leaves_bet_but_advances_marker() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 30)).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id()
            .times(1)
            .returning(|_| Ok(None));
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_some());
        assert!(db.last_resolution_call().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_match_still_running_leaves_bet() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 30)).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id().times(1).returning(|_| {
            let mut snapshot = finished_snapshot(1, 1, 1);
            snapshot.status = MatchStatus::SecondHalf;
            snapshot.elapsed = Some(70);
            Ok(Some(snapshot))
        });
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_some());
        assert_eq!(db.resolved_count().await.unwrap(), 0);
        assert!(db.last_resolution_call().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_unsettleable_record_stays_unresolved() {
        let db = memory_db().await;
        let mut bet = make_bet(1, 30);
        // An over record that lost its line cannot be settled.
        bet.over_line = None;
        db.add_unresolved_bet(&bet).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id()
            .times(1)
            .returning(|_| Ok(Some(finished_snapshot(1, 2, 1))));
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bet(1).await.unwrap().is_some());
        assert_eq!(db.resolved_count().await.unwrap(), 0);
        assert!(db.last_resolution_call().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_handles_multiple_bets() {
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 30)).await.unwrap();
        let mut score_bet = make_bet(2, 40);
        score_bet.bet_type = BetType::CorrectScore;
        score_bet.trigger_score = "2-0".to_string();
        score_bet.over_line = None;
        db.add_unresolved_bet(&score_bet).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id()
            .times(2)
            .returning(|id| match id {
                1 => Ok(Some(finished_snapshot(1, 3, 1))),
                _ => Ok(Some(finished_snapshot(2, 2, 0))),
            });
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();

        assert!(db.unresolved_bets().await.unwrap().is_empty());
        assert_eq!(db.resolved_count().await.unwrap(), 2);
        let resolved = db.resolved_bets(10).await.unwrap();
        assert!(resolved.iter().all(|r| r.outcome == BetOutcome::Win));
    }

    #[tokio::test]
    async fn test_empty_stale_set_never_touches_feed_or_marker() {
        let db = memory_db().await;

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id().times(0);
        let resolver = make_resolver(feed, Arc::clone(&db));

        resolver.sweep().await.unwrap();
        assert!(db.last_resolution_call().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_marker_ordering_is_parseable() {
        // Marker written by a sweep must read back through the store.
        let db = memory_db().await;
        db.add_unresolved_bet(&make_bet(1, 30)).await.unwrap();

        let mut feed = MockFeedClient::new();
        feed.expect_fetch_fixture_by_id()
            .times(1)
            .returning(|_| Ok(Some(finished_snapshot(1, 2, 1))));
        let resolver = make_resolver(feed, Arc::clone(&db));

        let before = Utc::now() - ChronoDuration::seconds(1);
        resolver.sweep().await.unwrap();

        let marker: DateTime<Utc> = db.last_resolution_call().await.unwrap().unwrap();
        assert!(marker >= before - ChronoDuration::seconds(1));
    }
}
