//! Storage module for nanobot
//!
//! - `json`: JSON - 범용 파일 저장/로드
//! - `session`: 세션 레코드 (`state.json`) 영구 저장
//! - `history`: 완료된 task 기록 (`history.jsonl`, append-only)

mod history;
mod json;
mod session;

// JSON Storage (범용)
pub use json::JsonStore;

// Session record
pub use session::{SessionRecord, SessionStore, SESSION_FILE};

// Task history
pub use history::{HistoryLog, HistoryRecord, HISTORY_FILE};
