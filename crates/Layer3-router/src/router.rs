//! Router - command → transition
//!
//! State-only commands are answered directly; `/task`, `/shell` and
//! `/confirm` are delegated to an executor, which delivers its own output.

use crate::command::{Command, HELP_TEXT};
use nanobot_foundation::expand_home;
use nanobot_foundation::strings::short_id;
use nanobot_foundation::ChatId;
use nanobot_task::{SessionState, ShellExecutor, StreamExecutor};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// What a command turns into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Send this text back
    Reply(String),
    /// Hand the prompt to the streaming executor
    Stream { prompt: String },
    /// Hand the command to the shell executor
    Shell { command: String, confirmed: bool },
}

impl Transition {
    fn reply(text: impl Into<String>) -> Self {
        Transition::Reply(text.into())
    }
}

pub struct Router {
    state: Arc<SessionState>,
    stream: StreamExecutor,
    shell: ShellExecutor,
}

impl Router {
    pub fn new(state: Arc<SessionState>, stream: StreamExecutor, shell: ShellExecutor) -> Self {
        Self {
            state,
            stream,
            shell,
        }
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Handle one inbound text. Returns the reply to send, if any.
    pub async fn handle(&self, chat: ChatId, text: &str) -> Option<String> {
        let command = Command::parse(text)?;
        debug!("[{}] /{}", chat, command.name());

        match self.transition(command) {
            Transition::Reply(text) => Some(text),
            Transition::Stream { prompt } => self.stream.run(chat, &prompt).await.reply(),
            Transition::Shell { command, confirmed } => {
                self.shell.run(chat, &command, confirmed).await.reply()
            }
        }
    }

    /// Apply a command's state change and decide what happens next
    pub fn transition(&self, command: Command) -> Transition {
        match command {
            Command::Task(prompt) => Transition::Stream { prompt },
            Command::Shell(command) => Transition::Shell {
                command,
                confirmed: false,
            },
            Command::Usage(usage) => Transition::reply(usage),
            Command::Help => Transition::reply(HELP_TEXT),

            Command::Confirm => match self.state.take_pending() {
                Some(command) => {
                    info!("Confirmed: {}", command);
                    Transition::Shell {
                        command,
                        confirmed: true,
                    }
                }
                None => Transition::reply("No pending command to confirm."),
            },
            Command::Deny => match self.state.take_pending() {
                Some(command) => {
                    info!("Denied: {}", command);
                    Transition::reply("Command cancelled.")
                }
                None => Transition::reply("No pending command."),
            },

            Command::New => {
                self.state.clear_session();
                info!("Session cleared");
                Transition::reply("Session cleared. Next /task starts a fresh conversation.")
            }
            Command::Cancel => {
                if self.state.cancel_active() {
                    Transition::reply("Cancelled.")
                } else {
                    Transition::reply("No task is currently running.")
                }
            }
            Command::Cd(raw) => self.change_dir(&raw),
            Command::Status => Transition::Reply(self.status()),
        }
    }

    fn change_dir(&self, raw: &str) -> Transition {
        let path = resolve_dir(&self.state.work_dir(), raw);
        if !path.is_dir() {
            return Transition::Reply(format!("Not a directory: {}", path.display()));
        }
        self.state.change_work_dir(&path);
        info!("Work dir changed to {}", path.display());
        Transition::Reply(format!("Work dir: {}\nSession cleared.", path.display()))
    }

    fn status(&self) -> String {
        let snapshot = self.state.snapshot();
        let session = snapshot
            .session_id
            .as_deref()
            .map(|id| short_id(id, 16))
            .unwrap_or_else(|| "None".to_string());
        let running = match snapshot.running {
            Some(task) => format!("Yes ({}s elapsed)", task.elapsed.as_secs()),
            None => "No".to_string(),
        };
        format!(
            "Work dir: {}\nSession: {}\nRunning: {}",
            snapshot.work_dir.display(),
            session,
            running
        )
    }
}

/// `~`-expand `raw`, resolve it against `work_dir` and normalize lexically
pub fn resolve_dir(work_dir: &Path, raw: &str) -> PathBuf {
    let expanded = expand_home(raw);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        work_dir.join(expanded)
    };
    normalize(&joined)
}

/// Drop `.` and fold `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
