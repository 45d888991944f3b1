use crate::schema::{MESSAGES, StateSchema};
use serde::{Deserialize, Serialize};

/// Who a message is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User input, including judge feedback injected back into the loop.
    Human,
    /// Model output.
    Ai,
    /// Instructions for the model. Never produced by the loop itself.
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }
}

/// A state that carries an ordered conversation.
///
/// Generators and judges only ever read the conversation and append to it,
/// so this is all the reflection loop needs to know about a caller's state.
pub trait MessagesState: Clone + Send + 'static {
    fn messages(&self) -> &[Message];

    fn push_message(&mut self, message: Message);

    fn last_message(&self) -> Option<&Message> {
        self.messages().last()
    }
}

/// The plain conversation state: just the messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl MessagesState for Conversation {
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }
}

impl StateSchema for Conversation {
    fn fields() -> &'static [&'static str] {
        &[MESSAGES]
    }
}
