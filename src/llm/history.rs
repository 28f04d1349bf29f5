use crate::llm::types::{ChatMessage, Role};

/// Bounds a conversation to the system message plus the latest
/// `max_turns` user/assistant pairs.
///
/// Dropped history is replaced by a single user note right after the system
/// message (or at the head when there is none). Returns the input unchanged
/// when it already fits.
pub fn trim_messages(messages: &[ChatMessage], max_turns: usize) -> Vec<ChatMessage> {
    let (system, rest) = match messages.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first), rest),
        _ => (None, messages),
    };

    let max_messages = max_turns * 2;
    if rest.len() <= max_messages {
        return messages.to_vec();
    }

    let dropped = rest.len() - max_messages;
    let steps_dropped = dropped / 2;
    tracing::debug!(dropped, steps_dropped, kept = max_messages, "conversation trimmed");

    let mut trimmed = Vec::with_capacity(max_messages + 2);
    trimmed.extend(system.cloned());
    trimmed.push(ChatMessage::user(omitted_note(steps_dropped)));
    trimmed.extend_from_slice(&rest[dropped..]);
    trimmed
}

fn omitted_note(steps: usize) -> String {
    format!("[{steps} earlier steps omitted]")
}
