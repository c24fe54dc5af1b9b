//! Telegram bot integration.

pub mod client;
pub mod render;

pub use client::{run_telegram_daemon, TelegramTransport};
