//! Session record - 재개 가능한 세션 ID와 작업 디렉토리의 영구 저장
//!
//! 시작 시 한 번 로드하고, 두 필드 중 하나가 바뀔 때마다 전체를 덮어쓴다.

use super::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 세션 레코드 파일명
pub const SESSION_FILE: &str = "state.json";

/// On-disk snapshot of the session identity and working directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Resumable conversation id reported by the CLI
    #[serde(default)]
    pub session_id: Option<String>,

    /// Working directory; absent in older files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<String>,
}

impl SessionRecord {
    pub fn new(session_id: Option<String>, work_dir: impl Into<String>) -> Self {
        Self {
            session_id,
            work_dir: Some(work_dir.into()),
        }
    }
}

/// `state.json` 저장소
#[derive(Debug, Clone)]
pub struct SessionStore {
    store: JsonStore,
}

impl SessionStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    /// 저장 파일 경로
    pub fn path(&self) -> PathBuf {
        self.store.file_path(SESSION_FILE)
    }

    /// 레코드 로드 (파일이 없으면 None)
    pub fn load(&self) -> Result<Option<SessionRecord>> {
        self.store.load_optional(SESSION_FILE)
    }

    /// 레코드 저장 (전체 덮어쓰기)
    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        self.store.save(SESSION_FILE, record)
    }
}
