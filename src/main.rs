//! # Herald — rate-limited Telegram broadcast & daily-schedule bot
//!
//! Usage:
//!   herald                      # run with ~/.herald/config.toml
//!   herald --config herald.toml # explicit config path
//!   herald --verbose            # debug logging

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use herald_bot::Orchestrator;
use herald_core::{HeraldConfig, RecipientId};
use herald_dispatch::Dispatcher;
use herald_scheduler::{CronSchedule, DailyTrigger};
use herald_store::Store;
use herald_telegram::TelegramApi;

#[derive(Parser)]
#[command(name = "herald", version, about = "📣 Herald — Telegram broadcast & schedule bot")]
struct Cli {
    /// Config file path (default: ~/.herald/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "herald=debug" } else { "herald=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => HeraldConfig::load_from(path)?,
        None => HeraldConfig::load()?,
    };
    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("telegram.bot_token is not configured");
    }
    if config.telegram.main_admin_id == 0 {
        anyhow::bail!("telegram.main_admin_id is not configured");
    }
    let schedule = CronSchedule::parse(&config.schedule.cron)?;

    // Open the store and make sure the main admin holds the capability.
    let db_path = shellexpand::tilde(&config.storage.db_path).to_string();
    let store = Arc::new(Store::open(
        std::path::Path::new(&db_path),
        config.schedule.queue_capacity,
    )?);
    let main_admin = RecipientId(config.telegram.main_admin_id);
    store.grant_admin(main_admin)?;

    // Connect the channel; an unreachable Bot API at boot is fatal.
    let api = TelegramApi::new(&config.telegram);
    let me = api.get_me().await.context("Telegram Bot API unreachable")?;
    tracing::info!(
        "🤖 Connected as @{} — {} recipients, {} queued",
        me.username.as_deref().unwrap_or("unknown"),
        store.recipient_count()?,
        store.drain()?.len()
    );

    let transport = Arc::new(api.clone());
    let dispatcher = Dispatcher::from_config(&config.broadcast);

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        transport.clone(),
        dispatcher.clone(),
        main_admin,
        config.telegram.welcome_message.clone(),
    ));

    tokio::spawn(DailyTrigger::new(store, dispatcher, transport, schedule).run());

    let mut events = api.start_polling();
    while let Some(event) = events.next().await {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.handle(event).await {
                tracing::warn!("⚠️ Handler error: {e}");
            }
        });
    }

    Ok(())
}
