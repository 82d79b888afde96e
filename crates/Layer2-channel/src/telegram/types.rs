//! Bot API payloads (only the fields nanobot reads)

use serde::Deserialize;

/// Envelope around every Bot API response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

impl Update {
    pub fn chat_id(&self) -> Option<i64> {
        self.message.as_ref().map(|m| m.chat.id)
    }

    /// Trimmed message text; empty for non-text updates
    pub fn text(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .map(str::trim)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_accessors() {
        let updates: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok":true,"result":[
                {"update_id":10,"message":{"message_id":1,"chat":{"id":42,"type":"private"},"text":"  /status  "}},
                {"update_id":11,"edited_message":{"message_id":1,"chat":{"id":42}}},
                {"update_id":12,"message":{"message_id":2,"chat":{"id":42},"sticker":{}}}
            ]}"#,
        )
        .unwrap();
        let updates = updates.result.unwrap();

        assert_eq!(updates[0].chat_id(), Some(42));
        assert_eq!(updates[0].text(), "/status");
        assert_eq!(updates[1].chat_id(), None);
        assert_eq!(updates[1].text(), "");
        assert_eq!(updates[2].text(), "");
    }

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<Message> = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: can't parse entities"}"#,
        )
        .unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(400));
    }
}
