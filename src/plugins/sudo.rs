//! Sudo command plugin.
//!
//! Owner-only maintenance commands: shell execution, raw database console,
//! restart/upgrade, bandwidth test, statistics, chat introspection and file
//! transfer. Every external effect is caught here and rendered as a reply;
//! nothing is allowed to crash the dispatch loop.

use std::path::PathBuf;

use serde::Deserialize;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, ReplyParameters};
use teloxide::utils::html::escape;
use tracing::warn;

use crate::bot::dispatcher::{AppState, ThrottledBot};
use crate::i18n::MessageScope;
use crate::utils::{format_timespan, is_forbidden_command, reply_html, REPLY_LIMIT};

/// Localization context registered by this module.
pub const CONTEXT: &str = "sudo";

/// Handle /sudos - prove the sudo gate lets the caller through.
pub async fn sudos_command(bot: ThrottledBot, msg: Message, _state: AppState) -> anyhow::Result<()> {
    reply_html(&bot, &msg, "Test").await
}

/// Handle /cmd - run a shell command and reply with its output.
pub async fn cmd_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    cmd: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let cmd = cmd.trim();
    if cmd.is_empty() {
        return reply_html(&bot, &msg, strings.get("no-command")).await;
    }
    if is_forbidden_command(cmd) {
        return reply_html(&bot, &msg, strings.get("forbidden-command")).await;
    }

    let text = match tokio::process::Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .await
    {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);

            let mut text = String::new();
            if !stdout.trim().is_empty() {
                text.push_str(&format!(
                    "<b>Output:</b>\n<code>{}</code>",
                    escape(stdout.trim())
                ));
            }
            if !stderr.trim().is_empty() {
                text.push_str(&format!(
                    "\n<b>Errors:</b>\n<code>{}</code>",
                    escape(stderr.trim())
                ));
            }
            if text.is_empty() {
                text = strings.get("no-output").to_string();
            }
            text
        }
        Err(err) => format!("<code>{}</code>", escape(&err.to_string())),
    };

    reply_html(&bot, &msg, text).await
}

/// Handle /db - run a raw database command (JSON document) and reply with
/// the result, as a document when too long for a message.
pub async fn db_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    query: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let query = query.trim();
    if query.is_empty() {
        return reply_html(&bot, &msg, strings.get("db-usage")).await;
    }

    match run_db_command(&state, query).await {
        Ok(result) if result.len() > REPLY_LIMIT => {
            bot.send_document(
                msg.chat.id,
                InputFile::memory(result.into_bytes()).file_name("output.json"),
            )
            .reply_parameters(ReplyParameters::new(msg.id))
            .await?;
            Ok(())
        }
        Ok(result) => reply_html(&bot, &msg, format!("<code>{}</code>", escape(&result))).await,
        Err(err) => {
            let text = strings
                .get("db-error")
                .replace("{error}", &escape(&err.to_string()));
            reply_html(&bot, &msg, text).await
        }
    }
}

async fn run_db_command(state: &AppState, query: &str) -> anyhow::Result<String> {
    let value: serde_json::Value = serde_json::from_str(query)?;
    let command = mongodb::bson::to_document(&value)?;
    let reply = state.db.db().run_command(command).await?;
    Ok(serde_json::to_string_pretty(&serde_json::to_value(&reply)?)?)
}

/// Handle /restart - leave a marker, reply, and replace the process.
pub async fn restart_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let sent = bot
        .send_message(msg.chat.id, strings.get("restarting"))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    state
        .restart
        .set_restart_marker(sent.chat.id.0, sent.id.0, strings.locale().as_str())
        .await?;

    respawn()
}

/// Handle /upgrade - pull latest sources; restart if anything changed.
pub async fn upgrade_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let sent = bot
        .send_message(msg.chat.id, strings.get("upgrading"))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    let output = match tokio::process::Command::new("git")
        .args(["pull", "--no-edit"])
        .output()
        .await
    {
        Ok(output) => output,
        Err(err) => {
            bot.edit_message_text(
                msg.chat.id,
                sent.id,
                format!("<code>{}</code>", escape(&err.to_string())),
            )
            .parse_mode(ParseMode::Html)
            .await?;
            return Ok(());
        }
    };

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.contains("Already up to date.") {
            bot.edit_message_text(msg.chat.id, sent.id, strings.get("nothing-to-upgrade"))
                .await?;
            return Ok(());
        }

        bot.edit_message_text(msg.chat.id, sent.id, strings.get("restarting"))
            .await?;
        state
            .restart
            .set_restart_marker(sent.chat.id.0, sent.id.0, strings.locale().as_str())
            .await?;
        return respawn();
    }

    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    log.push_str(&String::from_utf8_lossy(&output.stderr));
    let text = strings
        .get("upgrade-failed")
        .replace("{code}", &output.status.code().unwrap_or(-1).to_string())
        .replace("{log}", &escape(log.trim()));
    bot.edit_message_text(msg.chat.id, sent.id, text)
        .parse_mode(ParseMode::Html)
        .await?;

    // A failed pull can leave a half-applied merge behind.
    if let Err(err) = tokio::process::Command::new("git")
        .args(["merge", "--abort"])
        .output()
        .await
    {
        warn!(error = %err, "git merge --abort failed");
    }

    Ok(())
}

/// Replace the current process with a fresh copy of the executable.
/// Only returns on failure.
fn respawn() -> anyhow::Result<()> {
    use std::os::unix::process::CommandExt;

    let exe = std::env::current_exe()?;
    Err(std::process::Command::new(exe).exec().into())
}

#[derive(Debug, Deserialize)]
struct SpeedtestReport {
    ping: f64,
    /// Bits per second.
    download: f64,
    /// Bits per second.
    upload: f64,
    server: SpeedtestServer,
}

#[derive(Debug, Deserialize)]
struct SpeedtestServer {
    sponsor: String,
}

/// Handle /speedtest - run a bandwidth test and report the numbers.
pub async fn speedtest_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let sent = bot
        .send_message(msg.chat.id, strings.get("speedtest-running"))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    let text = match run_speedtest().await {
        Ok(report) => strings
            .get("speedtest")
            .replace("{host}", &escape(&report.server.sponsor))
            .replace("{ping}", &format!("{:.0}", report.ping))
            .replace("{download}", &format!("{:.2}", report.download / 1e6))
            .replace("{upload}", &format!("{:.2}", report.upload / 1e6)),
        Err(err) => strings
            .get("speedtest-failed")
            .replace("{error}", &escape(&err.to_string())),
    };

    bot.edit_message_text(msg.chat.id, sent.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn run_speedtest() -> anyhow::Result<SpeedtestReport> {
    let output = tokio::process::Command::new("speedtest-cli")
        .arg("--json")
        .output()
        .await?;
    anyhow::ensure!(
        output.status.success(),
        "speedtest-cli exited with {}",
        output.status
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Handle /stats - partition counts and uptime.
pub async fn stats_command(bot: ThrottledBot, msg: Message, state: AppState) -> anyhow::Result<()> {
    let text = match state.langs.counts().await {
        Ok((users, groups, channels)) => format!(
            "<b>Bot statistics:</b>\n\n\
             <b>Users:</b> {users}\n\
             <b>Groups:</b> {groups}\n\
             <b>Channels:</b> {channels}\n\n\
             <b>Uptime:</b> {}",
            format_timespan(state.started_at.elapsed())
        ),
        Err(err) => format!("<code>{}</code>", escape(&err.to_string())),
    };

    reply_html(&bot, &msg, text).await
}

/// Handle /leave - leave the current chat, or the one given by id.
pub async fn leave_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    target: String,
) -> anyhow::Result<()> {
    let target = target.trim();
    if target.is_empty() {
        if let Err(err) = bot.leave_chat(msg.chat.id).await {
            warn!(error = %err, chat = msg.chat.id.0, "leave_chat failed");
        }
        return Ok(());
    }

    match target.parse::<i64>() {
        Ok(id) => {
            if let Err(err) = bot.leave_chat(ChatId(id)).await {
                warn!(error = %err, chat = id, "leave_chat failed");
            }
            Ok(())
        }
        Err(_) => {
            let scope = MessageScope::from_message(&msg);
            let strings = state.localizer.strings(&scope, CONTEXT).await?;
            reply_html(&bot, &msg, strings.get("invalid-chat-id")).await
        }
    }
}

/// Handle /del - delete the replied-to message and the command itself.
pub async fn del_command(bot: ThrottledBot, msg: Message, _state: AppState) -> anyhow::Result<()> {
    if let Some(reply) = msg.reply_to_message() {
        if let Err(err) = bot.delete_message(msg.chat.id, reply.id).await {
            warn!(error = %err, "failed to delete replied-to message");
        }
    }
    if let Err(err) = bot.delete_message(msg.chat.id, msg.id).await {
        warn!(error = %err, "failed to delete command message");
    }
    Ok(())
}

/// Handle /doc - send a local file as a document.
pub async fn doc_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    path: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let path = path.trim();
    if path.is_empty() {
        return reply_html(&bot, &msg, strings.get("doc-usage")).await;
    }

    if let Err(err) = bot
        .send_document(msg.chat.id, InputFile::file(PathBuf::from(path)))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await
    {
        reply_html(&bot, &msg, format!("<code>{}</code>", escape(&err.to_string()))).await?;
    }
    Ok(())
}

/// Handle /upload - save the replied-to document to local disk.
pub async fn upload_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    path: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let Some(document) = msg.reply_to_message().and_then(|reply| reply.document()) else {
        return reply_html(&bot, &msg, strings.get("upload-usage")).await;
    };

    let sent = bot
        .send_message(msg.chat.id, strings.get("uploading"))
        .reply_parameters(ReplyParameters::new(msg.id))
        .await?;

    let dest = if path.trim().is_empty() {
        document
            .file_name
            .clone()
            .unwrap_or_else(|| document.file.unique_id.to_string())
    } else {
        path.trim().to_string()
    };

    let text = match download_document(&bot, &document.file.id.to_string(), &dest).await {
        Ok(()) => strings.get("upload-done").replace("{path}", &escape(&dest)),
        Err(err) => format!("<code>{}</code>", escape(&err.to_string())),
    };

    bot.edit_message_text(msg.chat.id, sent.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn download_document(bot: &ThrottledBot, file_id: &str, dest: &str) -> anyhow::Result<()> {
    let file = bot.get_file(file_id.to_string()).await?;
    let mut out = tokio::fs::File::create(dest).await?;
    // Throttle does not adapt Download; go through the inner bot.
    bot.inner().download_file(&file.path, &mut out).await?;
    Ok(())
}

/// Handle /chat - basic introspection of a chat by id or @username.
pub async fn chat_command(
    bot: ThrottledBot,
    msg: Message,
    state: AppState,
    target: String,
) -> anyhow::Result<()> {
    let scope = MessageScope::from_message(&msg);
    let strings = state.localizer.strings(&scope, CONTEXT).await?;

    let target = target.trim();
    if target.is_empty() {
        return reply_html(&bot, &msg, strings.get("chat-usage")).await;
    }

    let chat = if target.starts_with('@') {
        bot.get_chat(target.to_string()).await
    } else {
        match target.parse::<i64>() {
            Ok(id) => bot.get_chat(ChatId(id)).await,
            Err(_) => {
                return reply_html(&bot, &msg, strings.get("invalid-chat-id")).await;
            }
        }
    };

    let text = match chat {
        Ok(chat) if chat.is_private() => strings.get("chat-private").to_string(),
        Ok(chat) => {
            let members = bot
                .get_chat_member_count(chat.id)
                .await
                .map(|count| count.to_string())
                .unwrap_or_else(|_| "?".to_string());
            format!(
                "<b>Title:</b> {}\n<b>Username:</b> {}\n<b>Members:</b> {members}",
                escape(chat.title().unwrap_or("-")),
                escape(chat.username().unwrap_or("-")),
            )
        }
        Err(err) => format!("<code>{}</code>", escape(&err.to_string())),
    };

    reply_html(&bot, &msg, text).await
}
