//! One-line notices for tool invocations reported in the stream

use nanobot_foundation::strings::head_chars;
use serde_json::Value;

const NOTICE_PREVIEW: usize = 100;

fn tool_emoji(name: &str) -> &'static str {
    match name {
        "Bash" => "🔧",
        "Read" => "📖",
        "Write" => "✍️",
        "Edit" => "✏️",
        "Glob" | "Grep" => "🔍",
        "WebFetch" | "WebSearch" => "🌐",
        _ => "⚙️",
    }
}

fn str_field<'a>(input: &'a Value, key: &str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// e.g. `🔧 cargo build`, `📖 Read: src/main.rs`, `🌐 WebSearch: rust tokio`
pub fn format_tool_notification(name: &str, input: &Value) -> String {
    let emoji = tool_emoji(name);
    match name {
        "Bash" => {
            let command = str_field(input, "command").replace('\n', " ");
            format!("{} {}", emoji, head_chars(&command, NOTICE_PREVIEW))
        }
        "Read" | "Write" | "Edit" => format!("{} {}: {}", emoji, name, str_field(input, "file_path")),
        "Glob" | "Grep" => format!("{} {}: {}", emoji, name, str_field(input, "pattern")),
        _ => {
            let target = ["url", "query"]
                .iter()
                .filter_map(|key| input.get(*key))
                .find_map(|value| match value {
                    Value::Null => None,
                    Value::String(s) if s.is_empty() => None,
                    Value::String(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .unwrap_or_default();
            format!("{} {}: {}", emoji, name, head_chars(&target, NOTICE_PREVIEW))
        }
    }
}
