//! Error types shared across the bot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP {status}: {body}")]
    FeedStatus { status: u16, body: String },

    #[error("rate limited by feed, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("unknown tag in stored record: {0}")]
    UnknownTag(String),

    #[error("config error: {0}")]
    Config(String),
}
