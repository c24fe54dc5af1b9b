//! issueboard library root.

pub mod board;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod github;
pub mod identity;
pub mod logging;
pub mod telegram;

#[cfg(test)]
mod test_support;

pub use cli::Commands;
pub use command::{Dispatch, Dispatcher, IncomingLine, Transport};
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use telegram::run_telegram_daemon;
