//! Mercado Bitcoin Trading Bot CLI
//!
//! Runs the threshold trading bot, or looks up the account id needed in
//! the configuration (one-time setup).

use anyhow::Result;
use clap::{Parser, Subcommand};
use mercado_bot::{Bot, Config, ExchangeClient, SessionManager};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "mercado-bot")]
#[command(about = "Threshold trading bot for Mercado Bitcoin")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trading bot
    Run,

    /// Look up the account id for the configured credentials (run once,
    /// then put the id in ACCOUNT_ID)
    AccountId,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    // Load configuration; missing credentials or thresholds fail fast here
    let config = Config::from_env()?;

    match cli.command {
        Commands::Run => Bot::new(config).run().await?,
        Commands::AccountId => lookup_account_id(&config).await?,
    }

    Ok(())
}

/// One-time setup helper: authenticate and print the first account id
async fn lookup_account_id(config: &Config) -> Result<()> {
    let client = ExchangeClient::new(&config.api_base_url);
    let session = SessionManager::new(
        client.clone(),
        config.api_key.clone(),
        config.api_secret.clone(),
    );

    let s = session.authenticate().await?;

    info!("[ACCOUNT] fetching accounts...");
    let accounts = client.list_accounts(&s.access_token).await?;
    let first = accounts
        .first()
        .ok_or_else(|| anyhow::anyhow!("no accounts returned for these credentials"))?;

    println!("Account ID: {}", first.id);
    Ok(())
}
