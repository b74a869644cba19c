//! Document types stored in MongoDB.

use serde::{Deserialize, Serialize};

/// One row of a language-preference partition (`users`, `groups` or
/// `channels`), keyed by chat id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub chat_id: i64,

    /// Explicitly chosen locale code, if the chat ever set one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_lang: Option<String>,
}

/// Per-group greeting configuration (`welcome` collection). A group with
/// no document uses the defaults: greeting disabled, no custom template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WelcomeSettings {
    pub chat_id: i64,

    /// Custom greeting template; `None` renders the localized default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub enabled: bool,
}

impl WelcomeSettings {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Default::default()
        }
    }
}

/// Marker left behind by /restart and /upgrade so the next process can
/// edit the pending "restarting" message into a confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartMarker {
    pub chat_id: i64,
    pub message_id: i32,

    /// Locale the "restarting" reply was rendered in; the confirmation
    /// uses the same one.
    pub locale: String,

    /// Unix timestamp of the restart request.
    pub requested_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_record_roundtrip_without_lang() {
        let record = ChatRecord {
            chat_id: -100123,
            chat_lang: None,
        };
        let doc = mongodb::bson::to_document(&record).unwrap();
        assert!(!doc.contains_key("chat_lang"));

        let back: ChatRecord = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(back.chat_id, -100123);
        assert_eq!(back.chat_lang, None);
    }
}
