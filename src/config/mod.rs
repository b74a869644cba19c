//! Environment configuration.

use std::env;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,

    /// Owner user IDs (comma-separated in `OWNER_IDS`).
    /// Only these users may run sudo commands.
    pub owner_ids: Vec<u64>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Root of the `<locale>/<context>.json` dictionary tree.
    pub locales_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required environment variables are not set.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let owner_ids = env::var("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .filter_map(|s| s.trim().parse::<u64>().ok())
            .collect();

        let locales_dir = env::var("LOCALES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("locales"));

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN must be set"),
            owner_ids,
            mongodb_uri: env::var("MONGODB_URI").expect("MONGODB_URI must be set"),
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "polybot".to_string()),
            locales_dir,
        }
    }
}
