//! Live-feed client for the api-football v3 fixtures endpoints

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::config::FeedConfig;
use crate::error::{BotError, Result};
use crate::types::{MatchSnapshot, MatchStatus};


/// Feed and fixture request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
/// Sleep-and-retry attempts after a 429 before surfacing the error.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;
/// Wait applied when a 429 carries no usable Retry-After header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Abstract feed the controllers poll. The production implementation talks
/// to api-football; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// All currently live fixtures.
    async fn fetch_live_matches(&self) -> Result<Vec<MatchSnapshot>>;

    /// Authoritative current data for one fixture, `None` if the provider
    /// does not know it.
    async fn fetch_fixture_by_id(&self, fixture_id: i64) -> Result<Option<MatchSnapshot>>;
}

// Wire shape of the provider's /fixtures responses.

#[derive(Debug, Deserialize)]
struct FixturesResponse {
    #[serde(default)]
    response: Vec<FixtureEntry>,
}

#[derive(Debug, Deserialize)]
struct FixtureEntry {
    fixture: FixtureInfo,
    league: LeagueInfo,
    teams: TeamsInfo,
    goals: GoalsInfo,
}

#[derive(Debug, Deserialize)]
struct FixtureInfo {
    id: i64,
    status: StatusInfo,
}

#[derive(Debug, Deserialize)]
struct StatusInfo {
    short: String,
    elapsed: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct LeagueInfo {
    id: i64,
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct TeamsInfo {
    home: TeamInfo,
    away: TeamInfo,
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GoalsInfo {
    // Null until the first goal is scored.
    home: Option<i64>,
    away: Option<i64>,
}

impl FixtureEntry {
    fn into_snapshot(self) -> MatchSnapshot {
        MatchSnapshot {
            fixture_id: self.fixture.id,
            match_name: format!("{} vs {}", self.teams.home.name, self.teams.away.name),
            league_id: self.league.id,
            league_name: self.league.name,
            country: self.league.country,
            status: MatchStatus::from_short(&self.fixture.status.short),
            elapsed: self.fixture.status.elapsed,
            home_goals: self.goals.home.unwrap_or(0),
            away_goals: self.goals.away.unwrap_or(0),
        }
    }
}

/// HTTP client for api-football v3.
pub struct ApiFootballClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiFootballClient {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// GET /fixtures with the given query, absorbing rate limits with a
    /// bounded sleep-and-retry loop.
    async fn get_fixtures(&self, query: &[(&str, String)]) -> Result<Vec<MatchSnapshot>> {
        let url = format!("{}/fixtures", self.base_url);
        let mut attempt = 0u32;

        loop {
            let response = self
                .http
                .get(&url)
                .header("x-rapidapi-key", &self.api_key)
                .query(query)
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

                attempt += 1;
                if attempt > MAX_RATE_LIMIT_RETRIES {
                    return Err(BotError::RateLimited { retry_after_secs });
                }
                warn!(
                    "Feed rate limited, sleeping {}s before retry {}/{}",
                    retry_after_secs, attempt, MAX_RATE_LIMIT_RETRIES
                );
                tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(BotError::FeedStatus {
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                });
            }

            let parsed: FixturesResponse = response.json().await?;
            return Ok(parsed
                .response
                .into_iter()
                .map(FixtureEntry::into_snapshot)
                .collect());
        }
    }
}

#[async_trait]
impl FeedClient for ApiFootballClient {
    async fn fetch_live_matches(&self) -> Result<Vec<MatchSnapshot>> {
        self.get_fixtures(&[("live", "all".to_string())]).await
    }

    async fn fetch_fixture_by_id(&self, fixture_id: i64) -> Result<Option<MatchSnapshot>> {
        let mut matches = self.get_fixtures(&[("id", fixture_id.to_string())]).await?;
        if matches.is_empty() {
            Ok(None)
        } else {
            Ok(Some(matches.remove(0)))
        }
    }
}
