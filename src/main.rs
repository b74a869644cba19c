//! Polybot - multilingual Telegram bot with sudo tooling.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB integration (language partitions, restart marker)
//! - `cache` - Moka-based caching
//! - `i18n` - Locale dictionaries and per-chat locale resolution
//! - `bot` - Core bot functionality (with Throttle for API rate limiting)
//! - `plugins` - Command handlers (extensible)
//! - `utils` - Utility functions

mod bot;
mod cache;
mod config;
mod database;
mod i18n;
mod plugins;
mod utils;

use std::sync::Arc;

use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use teloxide::types::MessageId;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bot::dispatcher::{AppState, ThrottledBot};
use config::Config;
use database::Database;
use i18n::{LocaleCode, LocaleStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // Initialize logging with sensible defaults
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("polybot=info,teloxide=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting polybot...");

    // Load configuration
    let config = Config::from_env();
    info!("Configuration loaded successfully");

    // The locale store must be complete before any update is handled;
    // a broken dictionary aborts startup.
    let locales = Arc::new(LocaleStore::load(&config.locales_dir)?);

    // Connect to MongoDB
    info!("Connecting to MongoDB...");
    let db = Arc::new(Database::connect(&config.mongodb_uri, &config.mongodb_database).await?);
    info!("Database connected");

    // Initialize bot with Throttle for automatic rate limiting
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());

    let me = bot.get_me().await?;
    info!("Bot username: @{}", me.username());

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty); sudo commands are disabled");
    } else {
        info!("Bot owners: {:?}", config.owner_ids);
    }

    let state = AppState::new(db, locales, config.owner_ids.clone());

    confirm_restart(&bot, &state).await;

    // Build dispatcher and run the bot
    let dispatcher = bot::build_dispatcher(bot, state);
    bot::run(dispatcher).await;

    Ok(())
}

/// If the previous process left a restart marker behind, edit its pending
/// "restarting" message into a confirmation.
async fn confirm_restart(bot: &ThrottledBot, state: &AppState) {
    let marker = match state.restart.take_restart_marker().await {
        Ok(Some(marker)) => marker,
        Ok(None) => return,
        Err(err) => {
            warn!(error = %err, "failed to read restart marker");
            return;
        }
    };

    let strings = state.locales.scoped(plugins::sudo::CONTEXT);
    let locale = LocaleCode::resolve(&marker.locale);
    let text = strings.get(locale, "restarted").to_string();

    if let Err(err) = bot
        .edit_message_text(ChatId(marker.chat_id), MessageId(marker.message_id), text)
        .await
    {
        warn!(error = %err, chat = marker.chat_id, "failed to confirm restart");
    }
}
