//! Live Football Betting Bot
//!
//! Polls live fixtures, records bets when trigger windows fire and settles
//! them once their matches finish.

use clap::{Parser, Subcommand};
use livebet_bot::{
    config::Config,
    cycle::LiveCycle,
    feed::{ApiFootballClient, FeedClient},
    notify::Notifier,
    resolver::StaleResolver,
    storage::Database,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "livebet-bot")]
#[command(about = "Automated bet lifecycle bot for live football matches")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot
    Run,
    /// Show unresolved and recently resolved bets
    Status,
    /// Test Telegram notification
    TestNotify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run => run_bot(config).await,
        Commands::Status => show_status(config).await,
        Commands::TestNotify => test_notify(config).await,
    }
}

async fn run_bot(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting live football betting bot");

    // Initialize Telegram notifier
    let notifier = if let Some(tg) = &config.telegram {
        Notifier::new(tg)
    } else {
        tracing::warn!("Telegram not configured, notifications disabled");
        Notifier::disabled()
    };
    let notifier = Arc::new(notifier);

    // Send startup notification
    notifier.startup().await;

    // A failed store open degrades to a no-op store rather than exiting;
    // detection keeps running and the outage is reported.
    let db = match Database::connect(&config.database.path).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            tracing::error!("Could not open store at {}: {}", config.database.path, e);
            notifier.error("Store unavailable", &e.to_string()).await;
            Arc::new(Database::disabled())
        }
    };

    let feed: Arc<dyn FeedClient> = Arc::new(ApiFootballClient::new(&config.feed));

    let cycle = LiveCycle::new(Arc::clone(&feed), Arc::clone(&db), Arc::clone(&notifier));
    let resolver = StaleResolver::new(feed, Arc::clone(&db), Arc::clone(&notifier));

    let interval = Duration::from_secs(config.bot.cycle_interval_secs);
    tracing::info!("Polling every {}s", config.bot.cycle_interval_secs);

    // Main loop
    loop {
        if let Err(e) = cycle.run_once().await {
            tracing::error!("Cycle failed: {}", e);
            notifier.error("Cycle failed", &e.to_string()).await;
        }

        if let Err(e) = resolver.sweep().await {
            tracing::error!("Resolution sweep failed: {}", e);
            notifier.error("Resolution sweep failed", &e.to_string()).await;
        }

        tokio::time::sleep(interval).await;
    }
}

async fn show_status(config: Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database.path).await?;

    let unresolved = db.unresolved_bets().await?;
    println!("\n⏳ Unresolved bets: {}\n", unresolved.len());
    for bet in &unresolved {
        println!(
            "  {} | {} | {} at {} | placed {}",
            bet.fixture_id,
            bet.bet_type.as_str(),
            bet.match_name,
            bet.trigger_score,
            bet.placed_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let total = db.resolved_count().await?;
    let recent = db.resolved_bets(10).await?;
    println!("\n🏁 Resolved bets: {} (showing {})\n", total, recent.len());
    for bet in &recent {
        println!(
            "  {} | {} | {} final {} -> {}",
            bet.fixture_id,
            bet.bet_type.as_str(),
            bet.match_name,
            bet.final_score,
            bet.outcome.as_str()
        );
    }

    Ok(())
}

async fn test_notify(config: Config) -> anyhow::Result<()> {
    let tg_config = config
        .telegram
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Telegram not configured in config.toml"))?;

    let notifier = Notifier::new(tg_config);
    if notifier
        .send("🧪 <b>Test Notification</b>\n\nIf you see this, Telegram integration is working!")
        .await
    {
        println!("✅ Test notification sent!");
        Ok(())
    } else {
        Err(anyhow::anyhow!("Telegram rejected the test notification"))
    }
}
