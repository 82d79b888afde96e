//! Task Limits - 시간 제한 및 메시지 크기 제한 설정
//!
//! 기본값은 Telegram Bot API 제한과 Claude Code 실행 특성에 맞춰져 있으며,
//! memory 디렉토리의 `config.json`에서 개별 값을 덮어쓸 수 있습니다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for either task timeout (one day)
pub const MAX_TASK_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Timing and size limits shared by both task engines and the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskLimits {
    /// "Running..." placeholder가 나타나기까지의 지연 (ms)
    pub placeholder_delay_ms: u64,
    /// placeholder live edit 최소 간격 (ms)
    pub edit_interval_ms: u64,
    /// streaming task wall-clock 제한 (ms)
    pub stream_timeout_ms: u64,
    /// shell task 제한 (ms)
    pub shell_timeout_ms: u64,
    /// 이 길이(문자)를 넘는 결과는 파일로 첨부
    pub file_threshold: usize,
    /// edit 시 유지할 최대 문자 수 (앞부분을 잘라냄)
    pub edit_budget: usize,
    /// 한 메시지의 최대 문자 수 (넘으면 분할 전송)
    pub message_limit: usize,
    /// 에러 알림에 포함할 stderr 최대 문자 수
    pub diagnostic_limit: usize,
}

impl Default for TaskLimits {
    fn default() -> Self {
        Self {
            placeholder_delay_ms: 2_000,
            edit_interval_ms: 2_000,
            stream_timeout_ms: 300_000, // 5 minutes
            shell_timeout_ms: 60_000,
            file_threshold: 6_000,
            edit_budget: 3_900,
            message_limit: 4_000,
            diagnostic_limit: 500,
        }
    }
}

impl TaskLimits {
    pub fn placeholder_delay(&self) -> Duration {
        Duration::from_millis(self.placeholder_delay_ms)
    }

    pub fn edit_interval(&self) -> Duration {
        Duration::from_millis(self.edit_interval_ms)
    }

    /// Clamped to [`MAX_TASK_TIMEOUT`] so a deadline never overflows
    pub fn stream_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_timeout_ms).min(MAX_TASK_TIMEOUT)
    }

    pub fn shell_timeout(&self) -> Duration {
        Duration::from_millis(self.shell_timeout_ms).min(MAX_TASK_TIMEOUT)
    }
}

/// Human wording for a timeout ("5 minutes", "60 seconds", "1.5 seconds")
pub fn describe_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis >= 120_000 && millis % 60_000 == 0 {
        format!("{} minutes", millis / 60_000)
    } else if millis % 1_000 == 0 {
        let secs = millis / 1_000;
        format!("{} second{}", secs, if secs == 1 { "" } else { "s" })
    } else {
        format!("{:.1} seconds", duration.as_secs_f64())
    }
}
