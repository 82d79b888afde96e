//! Message splitting for the channel's per-message size limit

use nanobot_foundation::strings::{char_boundary, char_len};

/// Split `text` into chunks of at most `limit` characters, cutting at the
/// last newline inside the window when there is one.
///
/// Newlines at a cut are dropped from the start of the next chunk.
pub fn split_message(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    if char_len(text) <= limit {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        if char_len(rest) <= limit {
            chunks.push(rest);
            break;
        }
        let window = char_boundary(rest, limit);
        let cut = match rest[..window].rfind('\n') {
            Some(at) if at > 0 => at,
            _ => window,
        };
        chunks.push(&rest[..cut]);
        rest = rest[cut..].trim_start_matches('\n');
    }
    chunks
}
