//! Bot module - command table, handlers and the state they share.

pub mod calc;
pub mod commands;
pub mod database;
pub mod handlers;
pub mod inline;
pub mod replies;
pub mod state;
pub mod telegram;
pub mod textgen;


pub use database::Database;
pub use handlers::{Quoted, Request};
pub use state::AppState;
pub use telegram::TelegramClient;
pub use textgen::TextGenerator;
