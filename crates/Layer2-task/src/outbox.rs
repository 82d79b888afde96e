//! Outbound messages for one invocation
//!
//! [`Outbox`] binds a [`Messenger`] to a chat and swallows delivery failures
//! after logging them. [`Placeholder`] owns the deferred "in progress" message
//! and guarantees that the terminal text is delivered exactly once, either as
//! an edit of the placeholder or as a fresh message.

use nanobot_foundation::strings::{char_len, escape_html};
use nanobot_foundation::{ChatId, Markup, MessageHandle, Messenger};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

// ============================================================================
// Outbox
// ============================================================================

#[derive(Clone)]
pub struct Outbox {
    messenger: Arc<dyn Messenger>,
    chat: ChatId,
}

impl Outbox {
    pub fn new(messenger: Arc<dyn Messenger>, chat: ChatId) -> Self {
        Self { messenger, chat }
    }

    pub async fn send(&self, text: &str) {
        self.send_markup(text, Markup::Plain).await;
    }

    pub async fn send_html(&self, html: &str) {
        self.send_markup(html, Markup::Html).await;
    }

    pub async fn send_markup(&self, text: &str, markup: Markup) {
        if let Err(e) = self.messenger.send(self.chat, text, markup).await {
            error!("send_message error: {}", e);
        }
    }

    pub async fn send_with_handle(&self, text: &str) -> Option<MessageHandle> {
        match self.messenger.send_with_handle(self.chat, text).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("send_message_ret_id error: {}", e);
                None
            }
        }
    }

    pub async fn edit(&self, handle: MessageHandle, text: &str, markup: Markup) {
        if let Err(e) = self.messenger.edit(handle, text, markup).await {
            error!("edit_message error: {}", e);
        }
    }

    pub async fn send_file(&self, content: &str, filename: &str) {
        if let Err(e) = self
            .messenger
            .send_file(self.chat, content.as_bytes(), filename)
            .await
        {
            error!("send_document error: {}", e);
        }
    }

    /// Monospace block, or `output.txt` when longer than `file_threshold`
    pub async fn send_preformatted(&self, text: &str, file_threshold: usize) {
        if char_len(text) > file_threshold {
            self.send_file(text, "output.txt").await;
        } else {
            self.send_html(&format!("<pre>{}</pre>", escape_html(text)))
                .await;
        }
    }
}

// ============================================================================
// Placeholder
// ============================================================================

enum PlaceholderState {
    /// Timer armed, nothing sent yet
    Pending,
    Live {
        handle: MessageHandle,
        last_edit: Option<Instant>,
        last_len: usize,
    },
    /// Task ended before the timer fired, or the send failed
    Disarmed,
    Finished,
}

/// Deferred progress message with rate-limited live edits
pub struct Placeholder {
    outbox: Outbox,
    edit_interval: Duration,
    state: Mutex<PlaceholderState>,
}

impl Placeholder {
    pub fn new(outbox: Outbox, edit_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            outbox,
            edit_interval,
            state: Mutex::new(PlaceholderState::Pending),
        })
    }

    /// Send `text` after `delay` unless disarmed first
    pub fn arm(self: &Arc<Self>, delay: Duration, text: &'static str) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire(text).await;
        })
    }

    async fn fire(&self, text: &str) {
        // The send happens under the lock so disarm/finish observe either
        // "not sent" or "sent with handle", never a message in flight.
        let mut state = self.state.lock().await;
        if !matches!(*state, PlaceholderState::Pending) {
            return;
        }
        *state = match self.outbox.send_with_handle(text).await {
            Some(handle) => {
                debug!("Placeholder sent (message {})", handle.message_id);
                PlaceholderState::Live {
                    handle,
                    last_edit: None,
                    last_len: 0,
                }
            }
            None => PlaceholderState::Disarmed,
        };
    }

    pub async fn is_live(&self) -> bool {
        matches!(*self.state.lock().await, PlaceholderState::Live { .. })
    }

    /// Push accumulated text, at most once per edit interval.
    ///
    /// No-op without a live placeholder or if `text` is shorter than the last
    /// pushed text.
    pub async fn progress(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut state = self.state.lock().await;
        let PlaceholderState::Live {
            handle,
            last_edit,
            last_len,
        } = &mut *state
        else {
            return;
        };

        if last_edit.is_some_and(|at| at.elapsed() < self.edit_interval) {
            return;
        }
        let len = char_len(text);
        if len < *last_len {
            return;
        }

        self.outbox.edit(*handle, text, Markup::Plain).await;
        *last_edit = Some(Instant::now());
        *last_len = len;
    }

    /// Prevent a not-yet-sent placeholder from ever being sent
    pub async fn disarm(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, PlaceholderState::Pending) {
            *state = PlaceholderState::Disarmed;
        }
    }

    /// Deliver the terminal text. Only the first call has any effect.
    pub async fn finish(&self, text: &str, markup: Markup) {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, PlaceholderState::Finished) {
            PlaceholderState::Live { handle, .. } => self.outbox.edit(handle, text, markup).await,
            PlaceholderState::Pending | PlaceholderState::Disarmed => {
                self.outbox.send_markup(text, markup).await
            }
            PlaceholderState::Finished => warn!("Terminal message already delivered"),
        }
    }
}
