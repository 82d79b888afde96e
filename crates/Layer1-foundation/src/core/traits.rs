//! Core Traits - 핵심 인터페이스 정의
//!
//! Layer2 이상에서 구현해야 하는 trait들을 정의합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Layer4-CLI                                                 │
//! │  └── polling loop, 종료 처리                                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer3-Router                                              │
//! │  └── 명령어 → 전이 테이블, dispatch                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer2-Task / Layer2-Channel                               │
//! │  ├── Streaming / Shell executor (Messenger 사용)            │
//! │  └── Telegram client (Messenger, MarkupRenderer 구현)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Layer1-Foundation (이 레이어)                              │
//! │  └── Trait 정의 (Messenger, MarkupRenderer)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use super::types::{ChatId, Markup, MessageHandle};
use crate::Result;
use async_trait::async_trait;

// ============================================================================
// Messenger Trait - 메시지 전달 인터페이스
// ============================================================================

/// Outbound side of the chat channel.
///
/// Every operation may fail; callers in the task layer log and swallow the
/// error so that a failed notification never disturbs task bookkeeping.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send text, splitting it into several messages if it exceeds the
    /// channel's size limit.
    async fn send(&self, chat: ChatId, text: &str, markup: Markup) -> Result<()>;

    /// Send a single message and return its handle for later edits.
    async fn send_with_handle(&self, chat: ChatId, text: &str) -> Result<MessageHandle>;

    /// Replace the text of an existing message.
    ///
    /// Text longer than the edit budget keeps its tail. If the channel rejects
    /// the markup the edit is retried as plain text.
    async fn edit(&self, handle: MessageHandle, text: &str, markup: Markup) -> Result<()>;

    /// Deliver `content` as a file attachment.
    async fn send_file(&self, chat: ChatId, content: &[u8], filename: &str) -> Result<()>;
}

// ============================================================================
// MarkupRenderer Trait - 마크다운 변환
// ============================================================================

/// Converts free-form markdown into the channel's markup.
///
/// Must be total: unsupported constructs degrade to plain equivalents.
pub trait MarkupRenderer: Send + Sync {
    fn render(&self, markdown: &str) -> String;
}

/// Renderer that passes text through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl MarkupRenderer for PlainRenderer {
    fn render(&self, markdown: &str) -> String {
        markdown.to_string()
    }
}
