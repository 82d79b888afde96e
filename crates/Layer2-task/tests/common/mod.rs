//! Shared fixtures: a recording messenger and fake CLI scripts

#![allow(dead_code)]

use async_trait::async_trait;
use nanobot_foundation::{
    ChatId, ClaudeSettings, Markup, MessageHandle, Messenger, PlainRenderer, Result, TaskLimits,
};
use nanobot_task::{SessionState, ShellExecutor, StreamExecutor};
use parking_lot::Mutex;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const CHAT: ChatId = ChatId(1001);

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Send(String, Markup),
    Handle(String),
    Edit(i64, String, Markup),
    File(String, String),
}

/// Messenger that records every call in order
#[derive(Default)]
pub struct RecordingMessenger {
    log: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
}

impl RecordingMessenger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.log.lock().clone()
    }

    pub fn handles(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Handle(_)))
            .count()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, _chat: ChatId, text: &str, markup: Markup) -> Result<()> {
        self.log.lock().push(Sent::Send(text.to_string(), markup));
        Ok(())
    }

    async fn send_with_handle(&self, chat: ChatId, text: &str) -> Result<MessageHandle> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().push(Sent::Handle(text.to_string()));
        Ok(MessageHandle::new(chat, id))
    }

    async fn edit(&self, handle: MessageHandle, text: &str, markup: Markup) -> Result<()> {
        self.log
            .lock()
            .push(Sent::Edit(handle.message_id, text.to_string(), markup));
        Ok(())
    }

    async fn send_file(&self, _chat: ChatId, content: &[u8], filename: &str) -> Result<()> {
        self.log.lock().push(Sent::File(
            filename.to_string(),
            String::from_utf8_lossy(content).into_owned(),
        ));
        Ok(())
    }
}

/// Short limits so timing tests stay fast
pub fn test_limits() -> TaskLimits {
    TaskLimits {
        placeholder_delay_ms: 300,
        edit_interval_ms: 100,
        stream_timeout_ms: 1_000,
        shell_timeout_ms: 1_000,
        ..TaskLimits::default()
    }
}

/// Write an executable `sh` script into `dir`
pub fn fake_cli(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-claude");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// JSON lines for `echo`-ing from a script
pub fn text_event(text: &str) -> String {
    serde_json::json!({
        "type": "assistant",
        "message": { "content": [{ "type": "text", "text": text }] }
    })
    .to_string()
}

pub fn tool_event(name: &str, input: serde_json::Value) -> String {
    serde_json::json!({
        "type": "assistant",
        "message": { "content": [{ "type": "tool_use", "name": name, "input": input }] }
    })
    .to_string()
}

pub fn result_event(result: &str, session_id: &str) -> String {
    serde_json::json!({
        "type": "result",
        "result": result,
        "session_id": session_id,
        "duration_ms": 1200
    })
    .to_string()
}

/// Script line that prints `json` verbatim
pub fn emit(json: &str) -> String {
    format!("printf '%s\\n' '{}'", json.replace('\'', r"'\''"))
}

pub fn stream_executor(
    state: &Arc<SessionState>,
    messenger: &Arc<RecordingMessenger>,
    program: &Path,
    limits: TaskLimits,
) -> StreamExecutor {
    let claude = ClaudeSettings {
        program: program.to_string_lossy().into_owned(),
        ..ClaudeSettings::default()
    };
    StreamExecutor::new(
        Arc::clone(state),
        messenger.clone(),
        Arc::new(PlainRenderer),
        claude,
        limits,
    )
}

pub fn shell_executor(
    state: &Arc<SessionState>,
    messenger: &Arc<RecordingMessenger>,
    limits: TaskLimits,
) -> ShellExecutor {
    ShellExecutor::new(Arc::clone(state), messenger.clone(), limits)
}

/// Poll until `cond` holds or `limit` elapses
pub async fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
