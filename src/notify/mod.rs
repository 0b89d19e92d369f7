//! Telegram notifications
//!
//! Best-effort channel: sends are retried a bounded number of times and
//! failures are logged, never propagated, so a notification outage can not
//! corrupt a state transition.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error};

use crate::config::TelegramConfig;
use crate::types::{BetOutcome, BetType, UnresolvedBet};

/// Notification send timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
/// Attempts per message, with 1s / 2s backoff between them.
const MAX_SEND_ATTEMPTS: u32 = 3;
/// Error reports are cut to this many characters before sending.
const ERROR_REPORT_LIMIT: usize = 300;

#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
    enabled: bool,
    notify_bets: bool,
    notify_results: bool,
    notify_errors: bool,
}

#[derive(Serialize)]
struct SendMessageRequest {
    chat_id: String,
    text: String,
    parse_mode: String,
}

impl Notifier {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(SEND_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            enabled: true,
            notify_bets: config.notify_bets,
            notify_results: config.notify_results,
            notify_errors: config.notify_errors,
        }
    }

    /// A notifier that drops every message; used when Telegram is not
    /// configured and in tests.
    pub fn disabled() -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: String::new(),
            chat_id: String::new(),
            enabled: false,
            notify_bets: false,
            notify_results: false,
            notify_errors: false,
        }
    }

    /// Send a message, retrying up to [`MAX_SEND_ATTEMPTS`] times. Returns
    /// whether Telegram accepted it.
    pub async fn send(&self, text: &str) -> bool {
        if !self.enabled {
            debug!("Notifier disabled, dropping message");
            return false;
        }

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        for attempt in 0..MAX_SEND_ATTEMPTS {
            let request = SendMessageRequest {
                chat_id: self.chat_id.clone(),
                text: text.to_string(),
                parse_mode: "HTML".to_string(),
            };

            match self.http.post(&url).json(&request).send().await {
                Ok(response) if response.status().is_success() => return true,
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    error!(
                        "Telegram send failed (attempt {}): {} - {}",
                        attempt + 1,
                        status,
                        body
                    );
                }
                Err(e) => {
                    error!("Telegram send error (attempt {}): {}", attempt + 1, e);
                }
            }

            if attempt + 1 < MAX_SEND_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
            }
        }

        false
    }

    pub async fn startup(&self) -> bool {
        self.send("🚀 <b>Football betting bot started</b>\nMonitoring live matches.")
            .await
    }

    pub async fn bet_placed(&self, bet: &UnresolvedBet) -> bool {
        if !self.notify_bets {
            return false;
        }
        let text = match bet.bet_type {
            BetType::OverGoals => format!(
                "⏱ 32' - {}\n🏆 {} ({})\n🔢 Score: {}\n🎯 Bet placed: total goals <b>Over {}</b> at full time",
                bet.match_name,
                bet.league,
                bet.country,
                bet.trigger_score,
                line_display(bet),
            ),
            BetType::CorrectScore => format!(
                "⏱ 80' - {}\n🏆 {} ({})\n🔢 Score: {}\n🎯 80' correct-score bet placed for full time",
                bet.match_name, bet.league, bet.country, bet.trigger_score,
            ),
        };
        self.send(&text).await
    }

    pub async fn bet_resolved(
        &self,
        bet: &UnresolvedBet,
        outcome: BetOutcome,
        final_score: &str,
    ) -> bool {
        if !self.notify_results {
            return false;
        }
        let marker = match outcome {
            BetOutcome::Win => "✅ WON",
            BetOutcome::Loss => "❌ LOST",
            BetOutcome::Push => "➖ PUSH",
            BetOutcome::Error => "⚠️ UNRESOLVED",
        };
        let text = match bet.bet_type {
            BetType::OverGoals => format!(
                "🏁 <b>Final result - 32' over bet</b>\n⚽ {}\n🔢 Final score: <b>{}</b>\n🎯 Bet: Over {}\n📊 Outcome: {}",
                bet.match_name,
                final_score,
                line_display(bet),
                marker,
            ),
            BetType::CorrectScore => format!(
                "🏁 <b>Final result - 80' bet</b>\n⚽ {}\n🔢 Final score: <b>{}</b>\n🎯 Bet on 80' score: <b>{}</b>\n📊 Outcome: {}",
                bet.match_name, final_score, bet.trigger_score, marker,
            ),
        };
        self.send(&text).await
    }

    /// Report a failure, truncated so a long backtrace can not break the send.
    pub async fn error(&self, context: &str, detail: &str) -> bool {
        if !self.notify_errors {
            return false;
        }
        let detail: String = detail.chars().take(ERROR_REPORT_LIMIT).collect();
        self.send(&format!("❌ <b>{}</b>\n{}", context, detail))
            .await
    }
}

fn line_display(bet: &UnresolvedBet) -> String {
    bet.over_line
        .map(|line| line.to_string())
        .unwrap_or_else(|| "?".to_string())
}
