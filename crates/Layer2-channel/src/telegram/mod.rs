//! Telegram Bot API

mod client;
mod types;

pub use client::{TelegramClient, LONG_POLL_SECS};
pub use types::{ApiResponse, Chat, Message, Update};
