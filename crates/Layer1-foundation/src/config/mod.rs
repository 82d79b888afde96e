//! Config - 통합 설정 관리
//!
//! - `limits.rs` - 시간/크기 제한
//! - `bot.rs` - BotConfig 통합 설정

mod bot;
mod limits;

pub use bot::{
    expand_home, BotConfig, BotFileConfig, ClaudeSettings, TelegramSettings, BOT_CONFIG_FILE,
    DEFAULT_ALLOWED_TOOLS, DEFAULT_API_BASE,
};
pub use limits::{describe_duration, TaskLimits};
