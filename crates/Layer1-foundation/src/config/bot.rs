//! Bot Config - 통합 설정
//!
//! CLI 인자/환경 변수로 받은 값과 memory 디렉토리의 `config.json`을 합친다.

use super::TaskLimits;
use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 설정 파일명
pub const BOT_CONFIG_FILE: &str = "config.json";

/// Default Telegram Bot API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Tools the CLI is allowed to use without asking
pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &[
    "Read", "Write", "Edit", "Bash", "Glob", "Grep", "WebFetch", "WebSearch",
];

// ============================================================================
// Sections
// ============================================================================

/// Telegram 연결 설정
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub token: String,
    /// The single authorized chat; `None` means discovery mode
    pub chat_id: Option<i64>,
    pub api_base: String,
}

/// Claude Code CLI 실행 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudeSettings {
    /// Program name or path
    pub program: String,
    pub allowed_tools: Vec<String>,
}

impl Default for ClaudeSettings {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            allowed_tools: DEFAULT_ALLOWED_TOOLS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Optional overrides read from `config.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotFileConfig {
    #[serde(default)]
    pub limits: TaskLimits,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
}

// ============================================================================
// Bot Config (통합)
// ============================================================================

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub telegram: TelegramSettings,
    /// state.json / history.jsonl / config.json 위치
    pub memory_dir: PathBuf,
    /// `state.json`에 work_dir이 없을 때 사용
    pub default_work_dir: PathBuf,
    pub claude: ClaudeSettings,
    pub limits: TaskLimits,
}

impl BotConfig {
    pub fn new(telegram: TelegramSettings, memory_dir: PathBuf, default_work_dir: PathBuf) -> Self {
        Self {
            telegram,
            memory_dir,
            default_work_dir,
            claude: ClaudeSettings::default(),
            limits: TaskLimits::default(),
        }
    }

    pub fn with_claude_program(mut self, program: impl Into<String>) -> Self {
        self.claude.program = program.into();
        self
    }

    pub fn memory_store(&self) -> JsonStore {
        JsonStore::new(&self.memory_dir)
    }

    /// `config.json`이 있으면 덮어쓰기. 반환값: 파일 적용 여부
    pub fn apply_file_overrides(&mut self) -> Result<bool> {
        let Some(file) = self
            .memory_store()
            .load_optional::<BotFileConfig>(BOT_CONFIG_FILE)?
        else {
            return Ok(false);
        };
        self.limits = file.limits;
        if let Some(tools) = file.allowed_tools.filter(|tools| !tools.is_empty()) {
            self.claude.allowed_tools = tools;
        }
        Ok(true)
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
