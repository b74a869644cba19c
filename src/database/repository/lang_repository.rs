//! Chat language preference storage.
//!
//! Three collections partition the preference by chat kind: `users` for
//! private chats, `groups` for groups and supergroups, `channels` for
//! channels. Reads go through a short-lived cache so resolution does not
//! hit MongoDB on every message.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::UpdateOptions;
use mongodb::Collection;

use crate::cache::{CacheConfig, TypedCache};
use crate::database::models::ChatRecord;
use crate::database::Database;
use crate::i18n::ChatKind;

type Result<T> = std::result::Result<T, mongodb::error::Error>;

/// Keyed by (partition name, chat id).
type LangCacheKey = (&'static str, i64);

/// Repository over the language-preference partitions.
#[derive(Clone)]
pub struct LangRepository {
    users: Collection<ChatRecord>,
    groups: Collection<ChatRecord>,
    channels: Collection<ChatRecord>,
    cache: TypedCache<LangCacheKey, Option<String>>,
}

impl LangRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection("users"),
            groups: db.collection("groups"),
            channels: db.collection("channels"),
            cache: TypedCache::new(
                CacheConfig::with_capacity(10_000).ttl(Duration::from_secs(600)),
            ),
        }
    }

    fn partition(&self, kind: ChatKind) -> &Collection<ChatRecord> {
        match kind {
            ChatKind::Private => &self.users,
            ChatKind::Group | ChatKind::Supergroup => &self.groups,
            ChatKind::Channel => &self.channels,
        }
    }

    /// Stored locale code for a chat, if any. Negative results are cached
    /// too.
    pub async fn get_chat_lang(&self, chat_id: i64, kind: ChatKind) -> Result<Option<String>> {
        let key = (kind.partition(), chat_id);
        if let Some(lang) = self.cache.get(&key) {
            return Ok(lang);
        }

        let record = self
            .partition(kind)
            .find_one(doc! { "chat_id": chat_id })
            .await?;
        let lang = record.and_then(|record| record.chat_lang);

        self.cache.insert(key, lang.clone());
        Ok(lang)
    }

    /// Upsert a chat's locale and drop the cached entry.
    pub async fn set_chat_lang(&self, chat_id: i64, kind: ChatKind, lang: &str) -> Result<()> {
        self.partition(kind)
            .update_one(
                doc! { "chat_id": chat_id },
                doc! { "$set": { "chat_lang": lang } },
            )
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;

        self.cache.invalidate(&(kind.partition(), chat_id));
        Ok(())
    }

    /// Row counts per partition, for /stats.
    pub async fn counts(&self) -> Result<(u64, u64, u64)> {
        let users = self.users.count_documents(doc! {}).await?;
        let groups = self.groups.count_documents(doc! {}).await?;
        let channels = self.channels.count_documents(doc! {}).await?;
        Ok((users, groups, channels))
    }
}
