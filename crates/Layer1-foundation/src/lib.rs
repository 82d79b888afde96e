//! # nanobot-foundation
//!
//! Foundation layer for nanobot:
//! - Core: 채널 인터페이스 (Messenger, MarkupRenderer)
//! - Permission: 위험 shell 명령어 탐지
//! - Storage: JsonStore, 세션 레코드, task 히스토리
//! - Config: 통합 설정 (BotConfig, TaskLimits)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Telegram (long poll)                                   │
//! │                     │                                   │
//! │                     ▼                                   │
//! │          Command Router (transition table)              │
//! │                     │                                   │
//! │          ┌─────────┴─────────┐                         │
//! │          ▼                   ▼                         │
//! │   Streaming Executor   Shell Executor                  │
//! │   (claude CLI)         (sh -c, danger gate)            │
//! │          │                   │                         │
//! │          └────────┬──────────┘                         │
//! │                   ▼                                     │
//! │        SessionState (single task slot)                  │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod permission;
pub mod storage;
pub mod strings;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Core (핵심 Trait 및 타입)
// ============================================================================
pub use crate::core::{ChatId, Markup, MarkupRenderer, MessageHandle, Messenger, PlainRenderer};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    describe_duration, expand_home, BotConfig, BotFileConfig, ClaudeSettings, TaskLimits,
    TelegramSettings, BOT_CONFIG_FILE, DEFAULT_ALLOWED_TOOLS, DEFAULT_API_BASE,
};

// ============================================================================
// Permission (명령어 안전성)
// ============================================================================
pub use permission::{danger_reason, is_dangerous};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    HistoryLog, HistoryRecord, JsonStore, SessionRecord, SessionStore, HISTORY_FILE, SESSION_FILE,
};
