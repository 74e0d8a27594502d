//! Text helpers for chat output

/// Longest chunk sent as a single chat message
pub const MAX_MESSAGE_CHARS: usize = 1950;

/// Split `text` into chunks of at most `max_chars` characters
///
/// Prefers to break after a newline when one falls inside the chunk.
/// Empty input yields no chunks.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let end = match rest.char_indices().nth(max_chars) {
            None => rest.len(),
            Some((hard_end, _)) => match rest[..hard_end].rfind('\n') {
                Some(nl) if nl > 0 => nl + 1,
                _ => hard_end,
            },
        };
        chunks.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    chunks
}

/// Shorten `text` to `max_chars` characters for log output
pub fn truncate_utf8(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
