//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()`
//!
//! Every plugin registers its own localization context explicitly (see the
//! `CONTEXT` constant in each module).

pub mod language;
pub mod sudo;
pub mod welcome;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::bot::dispatcher::AppState;

/// All bot commands. Language and greeting commands are open (the
/// greeting ones check group admin rights themselves); the rest are
/// owner-only.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Set this chat's language")]
    Setlang(String),

    // Greeting commands
    #[command(description = "Toggle the group greeting on or off")]
    Welcome(String),

    #[command(description = "Set the group greeting template")]
    Setwelcome(String),

    #[command(description = "Show the group greeting template")]
    Getwelcome,

    #[command(description = "Reset the greeting to the default")]
    Resetwelcome,

    #[command(description = "Greeting template placeholder help")]
    Welcomeformat,

    // Sudo commands
    #[command(description = "Check that the sudo gate works")]
    Sudos,

    #[command(description = "Run a shell command")]
    Cmd(String),

    #[command(description = "Run a raw database command (JSON document)")]
    Db(String),

    #[command(description = "Restart the bot")]
    Restart,

    #[command(description = "Pull latest sources and restart")]
    Upgrade,

    #[command(description = "Run a bandwidth test")]
    Speedtest,

    #[command(description = "Bot statistics")]
    Stats,

    #[command(description = "Leave the current or given chat")]
    Leave(String),

    #[command(description = "Delete the replied-to message")]
    Del,

    #[command(description = "Send a local file as a document")]
    Doc(String),

    #[command(description = "Save the replied-to document to disk")]
    Upload(String),

    #[command(description = "Inspect a chat")]
    Chat(String),
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    let sudo_branch = dptree::filter(|msg: Message, state: AppState| {
        msg.from
            .as_ref()
            .is_some_and(|user| state.is_owner(user.id.0))
    })
    .branch(case![Command::Sudos].endpoint(sudo::sudos_command))
    .branch(case![Command::Cmd(cmd)].endpoint(sudo::cmd_command))
    .branch(case![Command::Db(query)].endpoint(sudo::db_command))
    .branch(case![Command::Restart].endpoint(sudo::restart_command))
    .branch(case![Command::Upgrade].endpoint(sudo::upgrade_command))
    .branch(case![Command::Speedtest].endpoint(sudo::speedtest_command))
    .branch(case![Command::Stats].endpoint(sudo::stats_command))
    .branch(case![Command::Leave(target)].endpoint(sudo::leave_command))
    .branch(case![Command::Del].endpoint(sudo::del_command))
    .branch(case![Command::Doc(path)].endpoint(sudo::doc_command))
    .branch(case![Command::Upload(path)].endpoint(sudo::upload_command))
    .branch(case![Command::Chat(target)].endpoint(sudo::chat_command));

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Setlang(code)].endpoint(language::setlang_command))
        .branch(case![Command::Welcome(mode)].endpoint(welcome::welcome_command))
        .branch(case![Command::Setwelcome(template)].endpoint(welcome::setwelcome_command))
        .branch(case![Command::Getwelcome].endpoint(welcome::getwelcome_command))
        .branch(case![Command::Resetwelcome].endpoint(welcome::resetwelcome_command))
        .branch(case![Command::Welcomeformat].endpoint(welcome::welcomeformat_command))
        .branch(sudo_branch)
}

/// Build the callback query handler.
pub fn callback_handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_callback_query().branch(
        dptree::filter(|q: CallbackQuery| {
            q.data
                .as_ref()
                .is_some_and(|data| data.starts_with("setlang:"))
        })
        .endpoint(language::setlang_callback),
    )
}
