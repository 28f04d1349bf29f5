pub mod bedrock;
pub mod openai_compatible;
pub mod openrouter;

use crate::llm::types::{ChatMessage, MessageContent, Role};

/// Splits off the system prompt for backends that take it outside the
/// message list. Only a plain-text system message counts; every system
/// message is dropped from the remainder.
pub(crate) fn split_system(messages: &[ChatMessage]) -> (String, Vec<&ChatMessage>) {
    let system = messages
        .iter()
        .find(|m| m.role == Role::System)
        .and_then(|m| match &m.content {
            MessageContent::Text(text) => Some(text.clone()),
            MessageContent::Parts(_) => None,
        })
        .unwrap_or_default();
    let rest = messages.iter().filter(|m| m.role != Role::System).collect();
    (system, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_text_is_split_off() {
        let msgs = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("a"),
            ChatMessage::assistant("b"),
        ];
        let (system, rest) = split_system(&msgs);
        assert_eq!(system, "rules");
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].role, Role::User);
    }

    #[test]
    fn missing_system_yields_empty_text() {
        let msgs = [ChatMessage::user("a")];
        let (system, rest) = split_system(&msgs);
        assert!(system.is_empty());
        assert_eq!(rest.len(), 1);
    }
}
