use serde::{Deserialize, Serialize};

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A message in the chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Whether a reply is in flight.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    #[default]
    Idle,
    Streaming,
}

/// What the display layer sees of a chat session at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub state: ChatState,
    /// Committed transcript, system instruction first.
    pub messages: Vec<ChatMessage>,
    /// Text of the reply currently streaming; empty when idle.
    pub partial: String,
}

impl ChatSnapshot {
    pub fn is_streaming(&self) -> bool {
        self.state == ChatState::Streaming
    }

    /// Committed messages without the hidden system instruction.
    pub fn visible_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages
            .iter()
            .filter(|message| message.role != ChatRole::System)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let value = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(value, json!({ "role": "assistant", "content": "hi" }));
    }

    #[test]
    fn visible_messages_skip_the_system_instruction() {
        let snapshot = ChatSnapshot {
            messages: vec![ChatMessage::system("rules"), ChatMessage::user("hello")],
            ..ChatSnapshot::default()
        };
        let visible: Vec<_> = snapshot.visible_messages().collect();
        assert_eq!(visible, vec![&ChatMessage::user("hello")]);
    }
}
