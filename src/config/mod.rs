//! Configuration, constructed once at startup and passed by reference into
//! each component. Trigger windows and resolution thresholds are fixed
//! constants in their modules, not configuration.

use serde::Deserialize;

use crate::error::{BotError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bot: BotConfig,
}

/// api-football v3 endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
}

fn default_base_url() -> String {
    "https://v3.football.api-sports.io".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_true")]
    pub notify_bets: bool,
    #[serde(default = "default_true")]
    pub notify_results: bool,
    #[serde(default = "default_true")]
    pub notify_errors: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Seconds between polling cycles.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            cycle_interval_secs: default_cycle_interval(),
        }
    }
}

fn default_cycle_interval() -> u64 {
    90
}

impl Config {
    /// Load from a TOML file, with `BOT_`-prefixed environment overrides
    /// (e.g. `BOT_FEED__API_KEY`).
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(true))
            .add_source(config::Environment::with_prefix("BOT").separator("__"))
            .build()
            .map_err(|e| BotError::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| BotError::Config(e.to_string()))
    }
}
