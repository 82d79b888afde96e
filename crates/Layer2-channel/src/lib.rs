//! # nanobot-channel
//!
//! Chat channel layer for nanobot:
//! - Telegram: Bot API client (`Messenger` 구현, long poll)
//! - Markdown: Telegram HTML 렌더러 (`MarkupRenderer` 구현)
//! - Split: 메시지 길이 제한에 맞춘 분할

pub mod markdown;
pub mod split;
pub mod telegram;

pub use markdown::{table_to_box, TelegramHtmlRenderer};
pub use split::split_message;
pub use telegram::{TelegramClient, Update, LONG_POLL_SECS};
