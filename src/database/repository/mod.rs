//! Repositories over the bot's collections.

mod lang_repository;
mod state_repository;
mod welcome_repository;

pub use lang_repository::LangRepository;
pub use state_repository::StateRepository;
pub use welcome_repository::WelcomeRepository;
