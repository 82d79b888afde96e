//! # nanobot-task
//!
//! Task execution for nanobot.
//! Owns the single task slot and runs the two kinds of tasks against it.
//!
//! ## Features
//!
//! - Shared session state with an atomic claim-and-spawn slot
//! - Streaming executor for the `claude` CLI (placeholder, live edits, timeout)
//! - Shell executor with a dangerous-command confirmation gate
//! - Cooperative cancellation via `/cancel`
//! - Exactly one terminal message per invocation

pub mod event;
pub mod executor;
pub mod notify;
pub mod outbox;
pub mod state;
pub mod task;

// Executors
pub use executor::{ShellExecutor, StreamExecutor, PLACEHOLDER_TEXT};

// State
pub use state::{RunningTask, SessionState, SlotGuard, StateSnapshot, TaskContext};
pub use task::{Execution, StartError, TaskId, TaskKind, TaskOutcome};

// Stream decoding
pub use event::{parse_line, ContentBlock, StreamEvent};
pub use notify::format_tool_notification;
pub use outbox::{Outbox, Placeholder};
