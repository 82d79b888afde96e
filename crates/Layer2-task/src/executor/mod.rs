//! Executors - one per task kind
//!
//! Both claim the single slot in [`SessionState`](crate::SessionState) before
//! spawning and release it before delivering their terminal message.

pub mod process;
mod shell;
mod stream;

pub use shell::ShellExecutor;
pub use stream::{StreamExecutor, PLACEHOLDER_TEXT};
