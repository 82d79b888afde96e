//! Security - 위험 shell 명령어 탐지
//!
//! `/shell`로 실행되는 명령어 중 확인이 필요한 것을 골라낸다.
//! - 삭제 (rm, shred, truncate)
//! - 권한 상승 (sudo)
//! - 디스크/파일시스템 파괴 (dd if=, mkfs)
//! - 원격 스크립트 실행 (`| sh`, `| bash`)
//! - 권한 전체 개방 (chmod 777)
//!
//! 샌드박스가 아닌 휴리스틱이다. 놓치는 경우(false negative)는 허용되고,
//! 잘못 잡는 경우(false positive)는 확인 한 번으로 끝난다.

use regex::Regex;
use std::sync::OnceLock;

// ============================================================
// 위험 명령어 패턴
// ============================================================

/// A destructive-shell signature
#[derive(Debug)]
pub struct DangerPattern {
    regex: Regex,
    pub reason: &'static str,
}

impl DangerPattern {
    fn new(pattern: &str, reason: &'static str) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(regex) => Some(Self { regex, reason }),
            Err(e) => {
                tracing::error!("invalid danger pattern {:?}: {}", pattern, e);
                None
            }
        }
    }

    pub fn matches(&self, command: &str) -> bool {
        self.regex.is_match(command)
    }
}

fn build_patterns() -> Vec<DangerPattern> {
    [
        (r"rm\s", "File deletion"),
        (r"sudo\s", "Elevated privileges"),
        (r"dd\s+if=", "Raw device write"),
        (r"\|\s*(bash|sh)\b", "Piping into a shell"),
        (r"chmod.*777", "World-writable permissions"),
        (r"truncate\s", "File truncation"),
        (r"mkfs\b", "Filesystem creation"),
        (r"shred\s", "Secure deletion"),
    ]
    .into_iter()
    .filter_map(|(pattern, reason)| DangerPattern::new(pattern, reason))
    .collect()
}

static PATTERNS: OnceLock<Vec<DangerPattern>> = OnceLock::new();

/// 전역 패턴 목록
pub fn danger_patterns() -> &'static [DangerPattern] {
    PATTERNS.get_or_init(build_patterns)
}

/// First matching signature, if any
pub fn danger_reason(command: &str) -> Option<&'static str> {
    danger_patterns()
        .iter()
        .find(|p| p.matches(command))
        .map(|p| p.reason)
}

/// True when the command needs explicit confirmation before running
pub fn is_dangerous(command: &str) -> bool {
    danger_reason(command).is_some()
}
