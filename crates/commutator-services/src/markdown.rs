//! MarkdownV2 escaping for chat messages.

use crate::error::ChannelError;

/// Bot API limit on message text, counted in characters.
pub const MAX_CHAT_MESSAGE_CHARS: usize = 4096;

const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Prefix every MarkdownV2 reserved character with a backslash.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Reject (never truncate) text above the chat length cap.
pub fn check_chat_length(text: &str) -> Result<(), ChannelError> {
    let length = text.chars().count();
    if length > MAX_CHAT_MESSAGE_CHARS {
        return Err(ChannelError::MessageTooLong {
            length,
            max: MAX_CHAT_MESSAGE_CHARS,
        });
    }
    Ok(())
}
