use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageState {
    /// Text is still being revealed by the reply controller
    Streaming,
    /// Text is frozen and the message is part of the permanent log
    Finalized,
}

/// Individual message in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub text: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
    pub memory_tags: Option<Vec<String>>,
    pub state: MessageState,
}

impl ConversationMessage {
    /// A user message; user input never streams, so it is finalized on creation.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            is_user: true,
            created_at: Utc::now(),
            memory_tags: None,
            state: MessageState::Finalized,
        }
    }

    /// Empty assistant placeholder that the controller fills in increment by increment
    pub fn streaming_reply(memory_tags: Option<Vec<String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: String::new(),
            is_user: false,
            created_at: Utc::now(),
            memory_tags,
            state: MessageState::Streaming,
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state == MessageState::Streaming
    }

    /// Append revealed text. Finalized messages are immutable, so this is ignored for them.
    pub(crate) fn push_text(&mut self, increment: &str) {
        if self.is_streaming() {
            self.text.push_str(increment);
        }
    }

    /// One-way transition into the permanent log
    pub(crate) fn finalize(mut self) -> Self {
        self.state = MessageState::Finalized;
        self
    }
}

/// Receiver of everything the reply controller produces.
///
/// Finalized messages (user and assistant) are appended; the in-flight reply is
/// mirrored through a separate streaming slot so the log itself only ever holds
/// finalized entries.
pub trait ConversationLog {
    fn append(&mut self, message: ConversationMessage);

    fn last_message(&self) -> Option<&ConversationMessage>;

    /// Live placeholder for the reply being streamed, `None` once it is finalized
    fn set_streaming(&mut self, _message: Option<&ConversationMessage>) {}

    /// Generation-state observer; the UI disables sending while this is true
    fn set_generating(&mut self, _generating: bool) {}
}

impl ConversationLog for Vec<ConversationMessage> {
    fn append(&mut self, message: ConversationMessage) {
        self.push(message);
    }

    fn last_message(&self) -> Option<&ConversationMessage> {
        self.last()
    }
}

/// Events fed into the chat screen's main loop
#[derive(Debug)]
pub enum TuiEvent {
    /// Key press event
    Key(crossterm::event::KeyEvent),

    /// Paste event
    Paste(String),

    /// Terminal resize
    Resize(u16, u16),

    /// Timer tick addressed to the reply controller
    Tick(crate::scheduler::Tick),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_are_created_finalized() {
        let message = ConversationMessage::user("hi");
        assert!(message.is_user);
        assert_eq!(message.state, MessageState::Finalized);
        assert_eq!(message.memory_tags, None);
    }

    #[test]
    fn finalized_text_is_immutable() {
        let mut message = ConversationMessage::streaming_reply(None);
        message.push_text("He");
        let mut message = message.finalize();
        message.push_text("llo");
        assert_eq!(message.text, "He");
    }

    #[test]
    fn ids_are_unique() {
        let a = ConversationMessage::user("a");
        let b = ConversationMessage::user("a");
        assert_ne!(a.id, b.id);
    }
}
