//! Language selection plugin.
//!
//! /setlang with an explicit code validates and persists it; without one it
//! offers the supported locales as an inline keyboard.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ReplyParameters};
use teloxide::utils::html::escape;
use tracing::warn;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::{LocaleCode, MessageScope, SUPPORTED_LOCALES};
use crate::utils::reply_html;

/// Localization context registered by this module.
pub const CONTEXT: &str = "language";

/// Handle /setlang.
pub async fn setlang_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    code: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let code = code.trim();
    if code.is_empty() {
        bot.send_message(msg.chat.id, strings.get("choose-language"))
            .reply_markup(locale_keyboard())
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
        return Ok(());
    }

    match LocaleCode::lookup(code) {
        Some(locale) => {
            state
                .localizer
                .set_chat_lang(scope.chat_id, scope.kind, locale)
                .await?;
            // Confirm in the language just chosen, not the old one.
            let text = state
                .locales
                .get(locale, CONTEXT, "language-set")
                .replace("{locale}", locale.as_str());
            reply_html(&bot, &msg, text).await
        }
        None => {
            let text = strings
                .get("unknown-language")
                .replace("{locale}", &escape(code));
            reply_html(&bot, &msg, text).await
        }
    }
}

/// Handle a `setlang:<code>` button press from the locale menu.
pub async fn setlang_callback(
    bot: ThrottledBot,
    q: CallbackQuery,
    state: AppState,
) -> anyhow::Result<()> {
    let code = q
        .data
        .as_deref()
        .and_then(|data| data.strip_prefix("setlang:"))
        .unwrap_or_default()
        .to_string();

    let scope = match MessageScope::from_callback(&q) {
        Ok(scope) => scope,
        Err(err) => {
            warn!(error = %err, "cannot resolve scope for setlang callback");
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };

    if let Some(locale) = LocaleCode::lookup(&code) {
        state
            .localizer
            .set_chat_lang(scope.chat_id, scope.kind, locale)
            .await?;

        let text = state
            .locales
            .get(locale, CONTEXT, "language-set")
            .replace("{locale}", locale.as_str());
        if let Some(message) = q.message.as_ref() {
            bot.edit_message_text(message.chat().id, message.id(), text)
                .await?;
        }
    }

    bot.answer_callback_query(q.id.clone()).await?;
    Ok(())
}

/// Supported locales, three buttons per row.
fn locale_keyboard() -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = SUPPORTED_LOCALES
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .map(|locale| {
                    InlineKeyboardButton::callback(locale.to_string(), format!("setlang:{locale}"))
                })
                .collect()
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}
