//! Message dispatcher setup.
//!
//! Builds the dispatcher with the command handlers and the shared state.

use std::sync::Arc;
use std::time::Instant;

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::database::{Database, LangRepository, StateRepository, WelcomeRepository};
use crate::i18n::{LocaleStore, Localizer};
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Arc<Database>,

    /// Immutable locale dictionaries, built before dispatch starts.
    pub locales: Arc<LocaleStore>,

    /// Per-chat locale resolution over store + stored preference.
    pub localizer: Localizer,

    /// Language preference partitions.
    pub langs: Arc<LangRepository>,

    /// Restart marker persistence.
    pub restart: Arc<StateRepository>,

    /// Per-group greeting configuration.
    pub welcome: Arc<WelcomeRepository>,

    /// Owner user IDs; the sudo gate.
    pub owner_ids: Vec<u64>,

    /// Process start, for /stats uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Arc<Database>, locales: Arc<LocaleStore>, owner_ids: Vec<u64>) -> Self {
        let langs = Arc::new(LangRepository::new(&db));
        let restart = Arc::new(StateRepository::new(&db));
        let welcome = Arc::new(WelcomeRepository::new(&db));
        let localizer = Localizer::new(Arc::clone(&locales), Arc::clone(&langs));

        Self {
            db,
            locales,
            localizer,
            langs,
            restart,
            welcome,
            owner_ids,
            started_at: Instant::now(),
        }
    }

    /// Check if a user is a bot owner.
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.owner_ids.contains(&user_id)
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(
    bot: ThrottledBot,
    state: AppState,
) -> Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey> {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    let message_handler = Update::filter_message()
        .branch(plugins::command_handler())
        .branch(
            dptree::filter(|msg: Message| {
                msg.new_chat_members()
                    .is_some_and(|members| !members.is_empty())
            })
            .endpoint(plugins::welcome::greet_new_members),
        );

    dptree::entry()
        .branch(message_handler)
        .branch(plugins::callback_handler())
}
