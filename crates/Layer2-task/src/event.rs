//! Stream events emitted by `claude --output-format stream-json`
//!
//! One JSON object per stdout line. Only `assistant` and `result` records
//! matter; everything else decodes to [`StreamEvent::Other`] and is skipped.

use serde::Deserialize;
use serde_json::Value;

/// A decoded stdout record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Assistant {
        #[serde(default)]
        message: AssistantMessage,
    },

    /// Terminal record
    Result {
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        duration_ms: Option<f64>,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Decode one line. Blank and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    serde_json::from_str(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_assistant_blocks() {
        let line = r#"{"type":"assistant","message":{"content":[
            {"type":"text","text":"Hello"},
            {"type":"tool_use","name":"Bash","input":{"command":"ls"}},
            {"type":"thinking","thinking":"..."}
        ]}}"#
            .replace('\n', "");
        let StreamEvent::Assistant { message } = parse_line(&line).unwrap() else {
            panic!("expected assistant");
        };
        assert_eq!(
            message.content,
            vec![
                ContentBlock::Text {
                    text: "Hello".into()
                },
                ContentBlock::ToolUse {
                    name: "Bash".into(),
                    input: json!({"command": "ls"}),
                },
                ContentBlock::Other,
            ]
        );
    }

    #[test]
    fn test_result_record() {
        let event = parse_line(
            r#"{"type":"result","subtype":"success","result":"done","session_id":"s-1","duration_ms":1234}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            StreamEvent::Result {
                result: Some("done".into()),
                session_id: Some("s-1".into()),
                duration_ms: Some(1234.0),
            }
        );
    }

    #[test]
    fn test_result_with_missing_fields() {
        let event = parse_line(r#"{"type":"result"}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Result {
                result: None,
                session_id: None,
                duration_ms: None,
            }
        );
    }

    #[test]
    fn test_skipped_lines() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(parse_line("not json"), None);
        assert_eq!(parse_line(r#"{"no_type":1}"#), None);
        assert_eq!(
            parse_line(r#"{"type":"system","subtype":"init"}"#),
            Some(StreamEvent::Other)
        );
    }
}
