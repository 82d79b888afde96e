//! Task definition and types

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for one task invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Which engine owns the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Long-form streaming task (claude CLI)
    Stream,
    /// Short-form shell command
    Shell,
}

impl TaskKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            TaskKind::Stream => "claude",
            TaskKind::Shell => "shell",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Terminal outcome of an invocation, produced exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Usable text result
    Completed { text: String },

    /// Wall-clock limit exceeded; process was killed
    TimedOut { after: Duration },

    /// Non-zero exit with diagnostic output
    Failed { exit_code: i32, diagnostic: String },

    /// No result and nothing to explain it (cancelled, crashed quietly)
    Interrupted,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TaskOutcome::Completed { .. } => "Completed",
            TaskOutcome::TimedOut { .. } => "Timeout",
            TaskOutcome::Failed { .. } => "Failed",
            TaskOutcome::Interrupted => "Interrupted",
        }
    }
}

/// Why an invocation never started. `Display` is the chat reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("A task is already running. Use /cancel to stop it.")]
    Busy,

    #[error("Error: `{program}` CLI not found in PATH.")]
    NotFound { program: String },

    #[error("Error: {0}")]
    Spawn(String),
}

/// Result of handing a command to an executor
#[derive(Debug, Clone, PartialEq)]
pub enum Execution {
    /// Nothing was spawned; reply with the error text
    Rejected(StartError),

    /// Dangerous shell command parked until /confirm or /deny
    NeedsConfirmation { command: String, reason: &'static str },

    /// The executor ran and already delivered its terminal message
    Finished(TaskOutcome),
}

impl Execution {
    /// Text the caller should send back, if any
    pub fn reply(&self) -> Option<String> {
        match self {
            Execution::Rejected(err) => Some(err.to_string()),
            Execution::NeedsConfirmation { command, .. } => Some(format!(
                "⚠️ Dangerous command detected:\n`{}`\n\nSend /confirm to execute or /deny to cancel.",
                command
            )),
            Execution::Finished(_) => None,
        }
    }

    pub fn outcome(&self) -> Option<&TaskOutcome> {
        match self {
            Execution::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }
}
