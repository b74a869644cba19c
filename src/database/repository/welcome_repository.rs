//! Greeting configuration storage.
//!
//! Joins are rare next to ordinary messages, so reads go through a
//! short-lived cache.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ReplaceOptions;
use mongodb::Collection;

use crate::cache::{CacheConfig, TypedCache};
use crate::database::models::WelcomeSettings;
use crate::database::Database;

type Result<T> = std::result::Result<T, mongodb::error::Error>;

/// Repository over the `welcome` collection, keyed by chat id.
pub struct WelcomeRepository {
    collection: Collection<WelcomeSettings>,
    cache: TypedCache<i64, WelcomeSettings>,
}

impl WelcomeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("welcome"),
            cache: TypedCache::new(
                CacheConfig::with_capacity(2_000).ttl(Duration::from_secs(300)),
            ),
        }
    }

    /// Settings for a chat; a chat that never configured anything gets the
    /// defaults.
    pub async fn get(&self, chat_id: i64) -> Result<WelcomeSettings> {
        if let Some(settings) = self.cache.get(&chat_id) {
            return Ok(settings);
        }

        let settings = self
            .collection
            .find_one(doc! { "chat_id": chat_id })
            .await?
            .unwrap_or_else(|| WelcomeSettings::new(chat_id));

        self.cache.insert(chat_id, settings.clone());
        Ok(settings)
    }

    /// Replace a chat's settings (upsert) and refresh the cached entry.
    pub async fn save(&self, settings: &WelcomeSettings) -> Result<()> {
        self.collection
            .replace_one(doc! { "chat_id": settings.chat_id }, settings)
            .with_options(ReplaceOptions::builder().upsert(true).build())
            .await?;

        self.cache.insert(settings.chat_id, settings.clone());
        Ok(())
    }
}
