//! Error types for nanobot
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// nanobot 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 채널 (Telegram) 관련
    // ========================================================================
    #[error("Channel error: {0}")]
    Channel(String),

    #[error("API error: {method} - {message}")]
    Api { method: String, message: String },

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// 일시적인 에러인지 확인 (polling loop에서 back-off 후 재시도)
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Channel(_))
    }

    /// API 에러 생성 헬퍼
    pub fn api(method: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Api {
            method: method.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = Error::api("editMessageText", "Bad Request: can't parse entities");
        assert_eq!(
            err.to_string(),
            "API error: editMessageText - Bad Request: can't parse entities"
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::Channel("reset".into()).is_transient());
        assert!(!Error::Config("missing token".into()).is_transient());
        assert!(!Error::api("getUpdates", "Unauthorized").is_transient());
        assert!(!Error::Storage("disk full".into()).is_transient());
    }
}
