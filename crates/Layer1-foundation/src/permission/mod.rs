//! Permission - shell 명령어 안전성 검사

pub mod security;

pub use security::{danger_patterns, danger_reason, is_dangerous, DangerPattern};
