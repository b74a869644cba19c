//! Group greeting plugin.
//!
//! Admins with the "change info" right configure a per-group greeting
//! template; when the greeting is enabled, members joining the group are
//! greeted with it (or with the localized default).

use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, ParseMode, ReplyParameters, User, UserId};
use teloxide::utils::html::escape;
use tracing::warn;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::{MessageScope, Strings};
use crate::utils::reply_html;

/// Localization context registered by this module.
pub const CONTEXT: &str = "welcome";

/// Handle /setwelcome - store a greeting template.
///
/// The template is rendered against the sender and sent back first; a
/// template Telegram rejects is caught here instead of on the next join.
pub async fn setwelcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    template: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;
    if !ensure_group_admin(&bot, &msg, &strings).await? {
        return Ok(());
    }

    let template = template.trim().to_string();
    if template.is_empty() {
        reply_html(&bot, &msg, strings.get("welcome-set-empty").to_string()).await?;
        return Ok(());
    }

    let Some(sender) = msg.from.as_ref() else {
        return Ok(());
    };
    let chat_title = msg.chat.title().unwrap_or_default();
    let count = member_count_for(&bot, &msg, &template).await;
    let preview = render_greeting(&template, std::slice::from_ref(sender), chat_title, count);

    let sent = bot
        .send_message(msg.chat.id, preview)
        .parse_mode(ParseMode::Html)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await;

    match sent {
        Ok(sent) => {
            let mut settings = state.welcome.get(msg.chat.id.0).await?;
            settings.message = Some(template);
            state.welcome.save(&settings).await?;

            let text = strings
                .get("welcome-set-success")
                .replace("{chat_title}", &escape(chat_title));
            bot.edit_message_text(sent.chat.id, sent.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Err(err) => {
            let text = strings
                .get("welcome-set-error")
                .replace("{error}", &escape(&err.to_string()));
            reply_html(&bot, &msg, text).await?;
        }
    }
    Ok(())
}

/// Handle /getwelcome - show the stored template verbatim.
pub async fn getwelcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;
    if !ensure_group_admin(&bot, &msg, &strings).await? {
        return Ok(());
    }

    let settings = state.welcome.get(msg.chat.id.0).await?;
    if !settings.enabled {
        reply_html(&bot, &msg, strings.get("welcome-disabled").to_string()).await?;
        return Ok(());
    }

    // No parse mode: the placeholders are shown as written.
    let text = settings
        .message
        .unwrap_or_else(|| strings.get("welcome-default").to_string());
    bot.send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;
    Ok(())
}

/// Handle /welcome - toggle the greeting on or off.
pub async fn welcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    mode: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;
    if !ensure_group_admin(&bot, &msg, &strings).await? {
        return Ok(());
    }

    let enabled = match mode.trim().to_lowercase().as_str() {
        "on" => true,
        "off" => false,
        _ => {
            reply_html(&bot, &msg, strings.get("welcome-mode-invalid").to_string()).await?;
            return Ok(());
        }
    };

    let mut settings = state.welcome.get(msg.chat.id.0).await?;
    settings.enabled = enabled;
    state.welcome.save(&settings).await?;

    let key = if enabled {
        "welcome-mode-enable"
    } else {
        "welcome-mode-disable"
    };
    let chat_title = escape(msg.chat.title().unwrap_or_default());
    let text = strings.get(key).replace("{chat_title}", &chat_title);
    reply_html(&bot, &msg, text).await
}

/// Handle /resetwelcome - drop the custom template.
pub async fn resetwelcome_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;
    if !ensure_group_admin(&bot, &msg, &strings).await? {
        return Ok(());
    }

    let mut settings = state.welcome.get(msg.chat.id.0).await?;
    settings.message = None;
    state.welcome.save(&settings).await?;

    let chat_title = escape(msg.chat.title().unwrap_or_default());
    let text = strings
        .get("welcome-reset")
        .replace("{chat_title}", &chat_title);
    reply_html(&bot, &msg, text).await
}

/// Handle /welcomeformat - explain the template placeholders. Open to
/// everyone, in any chat.
pub async fn welcomeformat_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;
    reply_html(&bot, &msg, strings.get("welcome-format-help").to_string()).await
}

/// Greet members joining a group, when the greeting is enabled.
pub async fn greet_new_members(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let Some(members) = msg.new_chat_members() else {
        return Ok(());
    };
    // Members added by a bot are not greeted.
    if msg.from.as_ref().is_some_and(|user| user.is_bot) {
        return Ok(());
    }

    let settings = state.welcome.get(msg.chat.id.0).await?;
    if !settings.enabled {
        return Ok(());
    }

    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;
    let template = settings
        .message
        .unwrap_or_else(|| strings.get("welcome-default").to_string());

    let count = member_count_for(&bot, &msg, &template).await;
    let chat_title = msg.chat.title().unwrap_or_default();
    let text = render_greeting(&template, members, chat_title, count);
    reply_html(&bot, &msg, text).await
}

/// Member count, fetched only when the template asks for it.
async fn member_count_for(bot: &ThrottledBot, msg: &Message, template: &str) -> u32 {
    if !template.contains("{count}") {
        return 0;
    }
    match bot.get_chat_member_count(msg.chat.id).await {
        Ok(count) => count,
        Err(err) => {
            warn!(error = %err, chat = msg.chat.id.0, "failed to fetch member count");
            0
        }
    }
}

/// Group-only, "change info" admins only. Replies with the matching
/// refusal and returns false when the gate fails.
async fn ensure_group_admin(
    bot: &ThrottledBot,
    msg: &Message,
    strings: &Strings,
) -> anyhow::Result<bool> {
    if !msg.chat.is_group() && !msg.chat.is_supergroup() {
        reply_html(bot, msg, strings.get("group-only").to_string()).await?;
        return Ok(false);
    }
    let Some(user) = msg.from.as_ref() else {
        return Ok(false);
    };
    if !can_change_info(bot, msg.chat.id, user.id).await {
        reply_html(bot, msg, strings.get("admin-required").to_string()).await?;
        return Ok(false);
    }
    Ok(true)
}

async fn can_change_info(bot: &ThrottledBot, chat_id: ChatId, user_id: UserId) -> bool {
    match bot.get_chat_member(chat_id, user_id).await {
        Ok(member) => match member.kind {
            ChatMemberKind::Owner(_) => true,
            ChatMemberKind::Administrator(admin) => admin.can_change_info,
            _ => false,
        },
        Err(err) => {
            warn!(error = %err, chat = chat_id.0, "failed to check admin rights");
            false
        }
    }
}

/// Substitute the template placeholders with the joining members' details.
/// Several members joining at once are joined with ", ".
fn render_greeting(template: &str, members: &[User], chat_title: &str, count: u32) -> String {
    let ids = join(members, |user| user.id.to_string());
    let usernames = join(members, |user| match &user.username {
        Some(name) => format!("@{name}"),
        None => mention(user),
    });
    let mentions = join(members, mention);
    let first_names = join(members, |user| escape(&user.first_name));
    let full_names = join(members, |user| escape(&user.full_name()));
    let title = escape(chat_title);

    template
        .replace("{id}", &ids)
        .replace("{username}", &usernames)
        .replace("{mention}", &mentions)
        .replace("{first_name}", &first_names)
        .replace("{full_name}", &full_names)
        .replace("{name}", &full_names)
        .replace("{title}", &title)
        .replace("{chat_title}", &title)
        .replace("{count}", &count.to_string())
}

fn join(members: &[User], f: impl Fn(&User) -> String) -> String {
    members.iter().map(f).collect::<Vec<_>>().join(", ")
}

/// HTML mention link for a user.
fn mention(user: &User) -> String {
    format!(
        r#"<a href="tg://user?id={}">{}</a>"#,
        user.id,
        escape(&user.first_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: u64, first: &str, last: Option<&str>, username: Option<&str>) -> User {
        User {
            id: UserId(id),
            is_bot: false,
            first_name: first.to_string(),
            last_name: last.map(str::to_string),
            username: username.map(str::to_string),
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        }
    }

    #[test]
    fn renders_member_placeholders() {
        let members = [member(7, "Ada", Some("Lovelace"), Some("ada"))];
        let text = render_greeting(
            "Hi {mention}, welcome to {title}! You are member #{count}.",
            &members,
            "Rustaceans",
            12,
        );
        assert_eq!(
            text,
            "Hi <a href=\"tg://user?id=7\">Ada</a>, welcome to Rustaceans! \
             You are member #12."
        );
    }

    #[test]
    fn joins_several_members_with_commas() {
        let members = [member(1, "A", None, None), member(2, "B", None, Some("bee"))];
        let text = render_greeting("{first_name} ({username})", &members, "g", 0);
        assert_eq!(text, "A, B (<a href=\"tg://user?id=1\">A</a>, @bee)");
    }

    #[test]
    fn name_and_full_name_include_the_last_name() {
        let members = [member(7, "Ada", Some("Lovelace"), None)];
        assert_eq!(render_greeting("{name}", &members, "g", 0), "Ada Lovelace");
        assert_eq!(
            render_greeting("{full_name}", &members, "g", 0),
            "Ada Lovelace"
        );
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let members = [member(1, "A", None, None)];
        assert_eq!(render_greeting("{verbatim}", &members, "g", 0), "{verbatim}");
    }

    #[test]
    fn html_in_names_is_escaped() {
        let members = [member(1, "<b>", None, None)];
        assert_eq!(render_greeting("{first_name}", &members, "g", 0), "&lt;b&gt;");
    }
}
