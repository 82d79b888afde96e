//! String Utilities
//!
//! Character-based truncation helpers shared by the channel and task layers.
//! Telegram counts message length in characters, so none of these split on
//! byte offsets.
//!
//! # Usage
//!
//! ```ignore
//! use nanobot_foundation::strings::{head_chars, tail_with_ellipsis};
//!
//! let preview = head_chars(command, 100);
//! let edit_text = tail_with_ellipsis(&accumulated, 3900);
//! ```

use std::borrow::Cow;

const ELLIPSIS: &str = "...";

/// Number of characters (not bytes)
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte offset of the `n`-th character, or `text.len()` if shorter
pub fn char_boundary(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

/// First `max` characters
pub fn head_chars(text: &str, max: usize) -> &str {
    &text[..char_boundary(text, max)]
}

/// Keep the tail of `text` so the result fits in `budget` characters,
/// marking the cut with a leading `...` when the budget leaves room for it.
pub fn tail_with_ellipsis(text: &str, budget: usize) -> Cow<'_, str> {
    let len = char_len(text);
    if len <= budget {
        return Cow::Borrowed(text);
    }
    if budget < ELLIPSIS.len() {
        return Cow::Borrowed(&text[char_boundary(text, len - budget)..]);
    }
    let keep = budget - ELLIPSIS.len();
    let start = char_boundary(text, len - keep);
    Cow::Owned(format!("{}{}", ELLIPSIS, &text[start..]))
}

/// Short form of an opaque id: first `n` characters followed by `...`
pub fn short_id(id: &str, n: usize) -> String {
    format!("{}...", head_chars(id, n))
}

/// Escape `&`, `<`, `>` and `"` for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
