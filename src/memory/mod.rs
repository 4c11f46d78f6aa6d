//! Conversation history windowing.
//!
//! The conversational provider receives only the most recent slice of the session's
//! history; older turns are dropped from the session as well so the transcript never
//! grows without bound.

use crate::types::Message;

/// Default number of recent messages to keep and send.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Returns the last `window` messages.
pub fn recent(history: &[Message], window: usize) -> &[Message] {
    let start = history.len().saturating_sub(window);
    &history[start..]
}

/// Drops everything but the last `window` messages, keeping order.
pub fn truncate_history(history: &mut Vec<Message>, window: usize) {
    if history.len() > window {
        let excess = history.len() - window;
        history.drain(..excess);
    }
}

/// Formats history as `role: content` lines, for logging and debugging.
pub fn format_history(history: &[Message]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
