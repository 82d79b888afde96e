//! # nanobot-router
//!
//! Turns chat text into work:
//! - [`Command`]: the command table (`/task`, `/shell`, `/cd`, ...)
//! - [`Router`]: applies a command to the session state or hands it to an executor
//! - [`Dispatcher`]: runs each message on its own task and supervises shutdown

pub mod command;
pub mod dispatcher;
pub mod router;

pub use command::{Command, HELP_TEXT};
pub use dispatcher::{Dispatcher, MAX_IN_FLIGHT};
pub use router::{resolve_dir, Router, Transition};
