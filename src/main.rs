//! Price Band Alert Bot
//!
//! Polls end-of-day closes and reports band transitions to a Telegram chat.

use clap::{Parser, Subcommand};
use pricewatch::{
    client::{PriceSource, YahooClient},
    config::{Config, Secrets},
    notify::{Notifier, TelegramNotifier},
    watcher::Watcher,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "End-of-day price band alerts over Telegram")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Secrets file path (bot token and chat id)
    #[arg(short, long, default_value = "secrets.toml")]
    secrets: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling loop
    Run {
        /// Log digests instead of sending them to Telegram
        #[arg(long)]
        dry_run: bool,
    },
    /// Fetch and classify once, print the table, send nothing
    Check,
    /// Send a test message to the configured chat
    TestNotify,
    /// Show recent Telegram updates (useful for finding the chat id)
    Updates,
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

    match cli.command {
        Commands::Run { dry_run } => run_watcher(&cli.config, &cli.secrets, dry_run).await,
        Commands::Check => check(&cli.config).await,
        Commands::TestNotify => test_notify(&cli.secrets).await,
        Commands::Updates => show_updates(&cli.secrets).await,
    }
}

async fn run_watcher(config_path: &str, secrets_path: &str, dry_run: bool) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;

    let notifier = if dry_run {
        tracing::warn!("Running in dry-run mode, digests will only be logged");
        TelegramNotifier::disabled()
    } else {
        let secrets = Secrets::load(secrets_path)?;
        TelegramNotifier::new(secrets.bot_token, secrets.chat_id)?
    };

    if config.alerts.is_empty() {
        tracing::warn!("No alerts configured, the watcher will idle");
    }

    let source = YahooClient::new()?;
    let watcher = Watcher::new(&config, source, notifier);

    tracing::info!("Starting price watcher");
    watcher.run(shutdown_signal()).await;

    Ok(())
}

async fn check(config_path: &str) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    let source = YahooClient::new()?;

    let symbols: Vec<String> = config.alerts.keys().cloned().collect();
    let update = source.latest_closes(&symbols).await?;

    println!("\n📊 {} tracked symbols:\n", config.alerts.len());
    println!(
        "{:<12} {:<20} {:>12} {:<14} {}",
        "Symbol", "Name", "Close", "Status", "Band"
    );
    println!("{}", "-".repeat(76));

    for (symbol, alert) in &config.alerts {
        let band = alert.band();
        match update.get(symbol) {
            Some(observed) => println!(
                "{:<12} {:<20} {:>12.3} {:<14} {}",
                symbol,
                alert.name,
                observed.close,
                band.classify(observed.close),
                band
            ),
            None => println!(
                "{:<12} {:<20} {:>12} {:<14} {}",
                symbol, alert.name, "-", "-", band
            ),
        }
    }

    Ok(())
}

async fn test_notify(secrets_path: &str) -> anyhow::Result<()> {
    let secrets = Secrets::load(secrets_path)?;
    let notifier = TelegramNotifier::new(secrets.bot_token, secrets.chat_id)?;

    notifier
        .send_text("Test notification. If you see this, Telegram integration is working!")
        .await?;

    println!("✅ Test notification sent!");
    Ok(())
}

async fn show_updates(secrets_path: &str) -> anyhow::Result<()> {
    let secrets = Secrets::load(secrets_path)?;
    let notifier = TelegramNotifier::new(secrets.bot_token, secrets.chat_id)?;

    let updates = notifier.get_updates(None).await?;
    if updates.is_empty() {
        println!("No recent updates. Message the bot first, then try again.");
        return Ok(());
    }

    for update in updates {
        if let Some(message) = update.message {
            println!(
                "chat_id={} from={} text={:?}",
                message.chat.id,
                message
                    .from
                    .map(|user| user.first_name)
                    .unwrap_or_else(|| "-".to_string()),
                message.text.unwrap_or_default()
            );
        }
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM so the watcher can finish its cycle and
/// exit instead of sleeping.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
