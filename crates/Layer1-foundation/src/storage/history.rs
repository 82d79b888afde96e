//! Task history - 완료된 task를 JSONL 파일에 한 줄씩 추가

use crate::{Error, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// 히스토리 파일명
pub const HISTORY_FILE: &str = "history.jsonl";

/// One completed streaming task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Local wall-clock time, `%Y-%m-%dT%H:%M:%S`
    pub ts: String,
    pub prompt: String,
    pub result: String,
    pub session_id: Option<String>,
    pub work_dir: String,
    /// Seconds, rounded to one decimal
    pub duration_s: f64,
}

impl HistoryRecord {
    /// Create a record stamped with the current local time
    pub fn new(
        prompt: impl Into<String>,
        result: impl Into<String>,
        session_id: Option<String>,
        work_dir: impl Into<String>,
        duration_s: f64,
    ) -> Self {
        Self {
            ts: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            prompt: prompt.into(),
            result: result.into(),
            session_id,
            work_dir: work_dir.into(),
            duration_s: (duration_s * 10.0).round() / 10.0,
        }
    }
}

/// Append-only JSONL log
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// memory 디렉토리 안의 기본 히스토리 파일
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 레코드 한 줄 추가
    pub fn append(&self, record: &HistoryRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                Error::Storage(format!("Failed to open {}: {}", self.path.display(), e))
            })?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_two_lines() {
        let dir = tempdir().unwrap();
        let log = HistoryLog::in_dir(dir.path());

        log.append(&HistoryRecord::new("p1", "r1", None, "/w", 1.0))
            .unwrap();
        log.append(&HistoryRecord::new("p2", "r2", Some("s".into()), "/w", 2.0))
            .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: HistoryRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.prompt, "p2");
        assert_eq!(second.session_id.as_deref(), Some("s"));
    }

    #[test]
    fn test_duration_rounding() {
        let record = HistoryRecord::new("p", "r", None, "/w", 12.345);
        assert_eq!(record.duration_s, 12.3);
        assert_eq!(record.ts.len(), "2024-01-01T00:00:00".len());
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let dir = tempdir().unwrap();
        // A directory where the file should be
        let log = HistoryLog::new(dir.path());
        assert!(log
            .append(&HistoryRecord::new("p", "r", None, "/w", 0.0))
            .is_err());
    }
}
