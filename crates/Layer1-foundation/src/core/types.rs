//! Core Types - 채널과 task 엔진이 공유하는 데이터 타입

use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identity a command came from (Telegram `chat.id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Reference to an already-sent message, used for in-place edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat: ChatId,
    pub message_id: i64,
}

impl MessageHandle {
    pub fn new(chat: ChatId, message_id: i64) -> Self {
        Self { chat, message_id }
    }
}

/// Markup mode for outgoing text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    /// 그대로 전송
    #[default]
    Plain,
    /// Telegram HTML subset; channel falls back to plain when rejected
    Html,
}

impl Markup {
    /// Telegram `parse_mode` value
    pub fn parse_mode(&self) -> Option<&'static str> {
        match self {
            Markup::Plain => None,
            Markup::Html => Some("HTML"),
        }
    }
}
