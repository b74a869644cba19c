//! Per-update locale resolution.
//!
//! [`MessageScope`] projects each update variant onto the three fields
//! resolution needs; [`Localizer`] combines the stored chat preference with
//! the client-reported language and normalizes the result into the
//! supported set.

use std::sync::Arc;

use teloxide::types::{CallbackQuery, InlineQuery, Message};

use crate::database::LangRepository;

use super::{ChatKind, I18nError, LocaleCode, LocaleStore, DEFAULT_LOCALE};

/// Projection of an incoming update onto the fields resolution needs.
#[derive(Debug, Clone)]
pub struct MessageScope {
    pub chat_id: i64,
    pub kind: ChatKind,
    pub reported_language: Option<String>,
}

impl MessageScope {
    pub fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            kind: ChatKind::from_chat(&msg.chat),
            reported_language: msg.from.as_ref().and_then(|user| user.language_code.clone()),
        }
    }

    /// Callback queries resolve through the chat of the message they are
    /// attached to. A query detached from any message has no chat to
    /// resolve against.
    pub fn from_callback(query: &CallbackQuery) -> Result<Self, I18nError> {
        let message = query
            .message
            .as_ref()
            .ok_or(I18nError::UnsupportedChatKind("callback query without message"))?;
        let chat = message.chat();
        Ok(Self {
            chat_id: chat.id.0,
            kind: ChatKind::from_chat(chat),
            reported_language: query.from.language_code.clone(),
        })
    }

    /// Inline queries come straight from a user; treated as a private chat
    /// of that user.
    #[allow(dead_code)]
    pub fn from_inline(query: &InlineQuery) -> Self {
        Self {
            chat_id: query.from.id.0 as i64,
            kind: ChatKind::Private,
            reported_language: query.from.language_code.clone(),
        }
    }
}

/// Pure resolution step: pick the candidate code and normalize it.
///
/// The reported language only applies to private chats; a group has no
/// single reporting user.
fn choose(stored: Option<String>, kind: ChatKind, reported: Option<&str>) -> LocaleCode {
    let candidate = match stored {
        Some(lang) => lang,
        None if kind.is_private() => reported
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
        None => DEFAULT_LOCALE.to_string(),
    };
    LocaleCode::resolve(&candidate)
}

/// Locale resolution front-end over the immutable store and the persisted
/// chat preference.
#[derive(Clone)]
pub struct Localizer {
    store: Arc<LocaleStore>,
    prefs: Arc<LangRepository>,
}

impl Localizer {
    pub fn new(store: Arc<LocaleStore>, prefs: Arc<LangRepository>) -> Self {
        Self { store, prefs }
    }

    /// Effective locale for a chat. Always a member of the supported set.
    pub async fn resolve_locale(&self, scope: &MessageScope) -> Result<LocaleCode, I18nError> {
        let stored = self.prefs.get_chat_lang(scope.chat_id, scope.kind).await?;
        Ok(choose(stored, scope.kind, scope.reported_language.as_deref()))
    }

    /// Resolve the locale and bind it together with a module context into a
    /// ready-to-use lookup for one update.
    pub async fn strings(
        &self,
        scope: &MessageScope,
        context: &'static str,
    ) -> Result<Strings, I18nError> {
        let locale = self.resolve_locale(scope).await?;
        Ok(Strings {
            store: Arc::clone(&self.store),
            locale,
            context,
        })
    }

    /// Persist an explicit language choice for a chat.
    pub async fn set_chat_lang(
        &self,
        chat_id: i64,
        kind: ChatKind,
        locale: LocaleCode,
    ) -> Result<(), I18nError> {
        self.prefs.set_chat_lang(chat_id, kind, locale.as_str()).await?;
        Ok(())
    }

    pub fn store(&self) -> &Arc<LocaleStore> {
        &self.store
    }
}

/// Locale- and context-bound lookup for a single update.
pub struct Strings {
    store: Arc<LocaleStore>,
    locale: LocaleCode,
    context: &'static str,
}

impl Strings {
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.store.get(self.locale, self.context, key)
    }

    /// Lookup against another module's context.
    #[allow(dead_code)]
    pub fn get_in<'a>(&'a self, context: &str, key: &'a str) -> &'a str {
        self.store.get_with(self.locale, self.context, key, Some(context))
    }

    pub fn locale(&self) -> LocaleCode {
        self.locale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use teloxide::types::{User, UserId};

    #[test]
    fn stored_preference_wins() {
        let locale = choose(Some("pt-BR".into()), ChatKind::Private, Some("de"));
        assert_eq!(locale.as_str(), "pt-BR");
    }

    #[test]
    fn private_chat_falls_back_to_reported_language() {
        let locale = choose(None, ChatKind::Private, Some("pt"));
        assert_eq!(locale.as_str(), "pt-BR");

        let locale = choose(None, ChatKind::Private, Some("en-us"));
        assert_eq!(locale.as_str(), "en-US");
    }

    #[test]
    fn unsupported_reported_language_resolves_to_default() {
        let locale = choose(None, ChatKind::Private, Some("xx-XX"));
        assert_eq!(locale.as_str(), DEFAULT_LOCALE);
    }

    #[test]
    fn groups_ignore_reported_language() {
        for kind in [ChatKind::Group, ChatKind::Supergroup, ChatKind::Channel] {
            let locale = choose(None, kind, Some("pt"));
            assert_eq!(locale.as_str(), DEFAULT_LOCALE);
        }
    }

    #[test]
    fn private_chat_without_any_hint_resolves_to_default() {
        let locale = choose(None, ChatKind::Private, None);
        assert_eq!(locale.as_str(), DEFAULT_LOCALE);
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = choose(Some("en-us".into()), ChatKind::Group, None);
        let b = choose(Some("en-us".into()), ChatKind::Group, None);
        assert_eq!(a, b);
    }

    #[test]
    fn inline_queries_project_as_a_private_chat_of_the_user() {
        let query = InlineQuery {
            id: "1".to_string(),
            from: User {
                id: UserId(42),
                is_bot: false,
                first_name: "Ana".to_string(),
                last_name: None,
                username: None,
                language_code: Some("pt".to_string()),
                is_premium: false,
                added_to_attachment_menu: false,
            },
            location: None,
            query: String::new(),
            offset: String::new(),
            chat_type: None,
        };

        let scope = MessageScope::from_inline(&query);
        assert_eq!(scope.chat_id, 42);
        assert!(scope.kind.is_private());
        assert_eq!(scope.reported_language.as_deref(), Some("pt"));

        let locale = choose(None, scope.kind, scope.reported_language.as_deref());
        assert_eq!(locale.as_str(), "pt-BR");
    }

    #[test]
    fn cross_context_lookup_falls_back_like_any_other() {
        let root = std::env::temp_dir().join(format!(
            "polybot-strings-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(root.join("en-GB")).unwrap();
        fs::write(
            root.join("en-GB").join("language.json"),
            r#"{"pick": "Pick a language"}"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("pt-BR")).unwrap();
        fs::write(
            root.join("pt-BR").join("sudo.json"),
            r#"{"restarting": "Reiniciando..."}"#,
        )
        .unwrap();

        let store = Arc::new(LocaleStore::load(&root).unwrap());
        let _ = fs::remove_dir_all(&root);

        let strings = Strings {
            store,
            locale: LocaleCode::lookup("pt-BR").unwrap(),
            context: "sudo",
        };

        assert_eq!(strings.get("restarting"), "Reiniciando...");
        // pt-BR never loaded a "language" context; the cross-context lookup
        // borrows the default locale's table for it.
        assert_eq!(strings.get_in("language", "pick"), "Pick a language");
        assert_eq!(strings.get_in("language", "missing"), "missing");
    }
}
