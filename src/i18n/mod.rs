//! Localization subsystem.
//!
//! A read-only [`LocaleStore`] is built once at startup from per-locale JSON
//! dictionaries; the [`Localizer`] resolves the effective locale for each
//! incoming chat (stored preference, then client-reported language for
//! private chats, then the default) and hands handlers a bound lookup.

mod resolve;
mod store;

pub use resolve::{Localizer, MessageScope, Strings};
pub use store::{LocaleStore, Scoped};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Locales the bot ships dictionaries for. Declaration order matters:
/// a bare language tag resolves to the first entry sharing its prefix.
pub const SUPPORTED_LOCALES: [&str; 25] = [
    "en-GB",  // English (United Kingdom)
    "en-US",  // English (United States)
    "pt-BR",  // Portuguese (Brazil)
    "es-ES",  // Spanish
    "fr-FR",  // French
    "de-DE",  // German
    "it-IT",  // Italian
    "nl-NL",  // Dutch
    "ar-SA",  // Arabic
    "ckb-IR", // Sorani (Kurdish)
    "fi-FI",  // Finnish
    "he-IL",  // Hebrew
    "id-ID",  // Indonesian
    "ja-JP",  // Japanese
    "no-NO",  // Norwegian
    "pl-PL",  // Polish
    "pt-BRe", // Portuguese (Brazil, extended version)
    "pt-BR2", // Portuguese (Brazil, informal version)
    "ro-RO",  // Romanian
    "ru-RU",  // Russian
    "sv-SE",  // Swedish
    "tr-TR",  // Turkish
    "uk-UA",  // Ukrainian
    "zh-CN",  // Chinese (Simplified)
    "zh-TW",  // Chinese (Traditional)
];

/// Locale used when a chat has no usable preference, and the fallback
/// source for missing translations. Its dictionaries are expected to be
/// complete.
pub const DEFAULT_LOCALE: &str = "en-GB";

/// Errors from the localization subsystem.
#[derive(Debug, Error)]
pub enum I18nError {
    /// The update variant carries no chat resolution can work with.
    /// Indicates a dispatcher/resolver mismatch, not user error.
    #[error("unsupported chat kind: {0}")]
    UnsupportedChatKind(&'static str),

    /// A locale file or directory could not be read at startup.
    #[error("failed to read locale path {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A locale file is not a flat JSON object of strings.
    #[error("malformed locale file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Preference storage failed underneath resolution.
    #[error("language preference storage error")]
    Storage(#[from] mongodb::error::Error),
}

/// Canonical locale identifier.
///
/// Only constructed through [`LocaleCode::lookup`] or
/// [`LocaleCode::resolve`], so a value of this type is always a member of
/// [`SUPPORTED_LOCALES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocaleCode(&'static str);

impl LocaleCode {
    /// The canonical entry for an exactly matching supported code.
    pub fn lookup(code: &str) -> Option<Self> {
        SUPPORTED_LOCALES
            .iter()
            .find(|supported| **supported == code)
            .map(|supported| Self(supported))
    }

    /// Normalize a candidate code and coerce it into the supported set.
    ///
    /// A bare language tag (no region segment) adopts the first supported
    /// locale starting with it; an all-lower-case region segment is
    /// upper-cased. Anything still outside the supported set becomes the
    /// default locale.
    pub fn resolve(candidate: &str) -> Self {
        let normalized = match candidate.split_once('-') {
            None => SUPPORTED_LOCALES
                .iter()
                .find(|supported| supported.starts_with(candidate))
                .map(|supported| (*supported).to_string())
                .unwrap_or_else(|| candidate.to_string()),
            Some((language, region)) => {
                // Mixed-case regions (e.g. "BRe") are left untouched.
                let all_lower = region.chars().any(char::is_lowercase)
                    && !region.chars().any(char::is_uppercase);
                if all_lower {
                    format!("{language}-{}", region.to_uppercase())
                } else {
                    candidate.to_string()
                }
            }
        };

        Self::lookup(&normalized).unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for LocaleCode {
    fn default() -> Self {
        Self(DEFAULT_LOCALE)
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Classification of a chat endpoint. Selects the preference partition:
/// groups and supergroups share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    /// Name of the collection backing this kind's language preference.
    pub fn partition(self) -> &'static str {
        match self {
            ChatKind::Private => "users",
            ChatKind::Group | ChatKind::Supergroup => "groups",
            ChatKind::Channel => "channels",
        }
    }

    pub fn is_private(self) -> bool {
        matches!(self, ChatKind::Private)
    }

    pub fn from_chat(chat: &teloxide::types::Chat) -> Self {
        if chat.is_private() {
            ChatKind::Private
        } else if chat.is_group() {
            ChatKind::Group
        } else if chat.is_supergroup() {
            ChatKind::Supergroup
        } else {
            ChatKind::Channel
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_exact_member() {
        assert_eq!(LocaleCode::lookup("pt-BR").unwrap().as_str(), "pt-BR");
        assert!(LocaleCode::lookup("pt-br").is_none());
        assert!(LocaleCode::lookup("xx-XX").is_none());
    }

    #[test]
    fn bare_tag_adopts_first_prefix_match() {
        assert_eq!(LocaleCode::resolve("pt").as_str(), "pt-BR");
        assert_eq!(LocaleCode::resolve("en").as_str(), "en-GB");
        assert_eq!(LocaleCode::resolve("zh").as_str(), "zh-CN");
    }

    #[test]
    fn lowercase_region_is_uppercased() {
        assert_eq!(LocaleCode::resolve("en-us").as_str(), "en-US");
        assert_eq!(LocaleCode::resolve("pt-br").as_str(), "pt-BR");
    }

    #[test]
    fn mixed_case_region_left_alone() {
        assert_eq!(LocaleCode::resolve("pt-BRe").as_str(), "pt-BRe");
        assert_eq!(LocaleCode::resolve("pt-BR2").as_str(), "pt-BR2");
    }

    #[test]
    fn unsupported_codes_fall_back_to_default() {
        assert_eq!(LocaleCode::resolve("xx-XX").as_str(), DEFAULT_LOCALE);
        assert_eq!(LocaleCode::resolve("xx").as_str(), DEFAULT_LOCALE);
        assert_eq!(LocaleCode::resolve("").as_str(), "en-GB");
    }

    #[test]
    fn resolve_never_leaves_the_supported_set() {
        for candidate in ["pt", "en-us", "xx-XX", "de", "he-il", "garbage-"] {
            let resolved = LocaleCode::resolve(candidate);
            assert!(SUPPORTED_LOCALES.contains(&resolved.as_str()));
        }
    }

    #[test]
    fn partitions() {
        assert_eq!(ChatKind::Private.partition(), "users");
        assert_eq!(ChatKind::Group.partition(), "groups");
        assert_eq!(ChatKind::Supergroup.partition(), "groups");
        assert_eq!(ChatKind::Channel.partition(), "channels");
    }
}
