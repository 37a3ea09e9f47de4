//! Chat model shared by GlassChat front ends: participants, messages,
//! reactions, and the in-memory conversation store.

pub mod directory;
pub mod reactions;
pub mod store;

pub use directory::{seed_conversations, Directory, AI_CONTACT_ID, AI_GREETING, CURRENT_USER_ID};
pub use reactions::{Reactions, REACTION_PALETTE};
pub use store::ConversationStore;

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Identifier of a chat participant, either the signed-in user or a contact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique identifier assigned to a message when it is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("msg-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Avatar image URL.
    pub avatar: String,
}

impl User {
    /// The local user of a chat screen. Always carries the id `"user"`.
    pub fn signed_in(name: &str) -> Self {
        Self {
            id: UserId::new(CURRENT_USER_ID),
            name: name.to_string(),
            avatar: format!("https://i.pravatar.cc/150?u={name}"),
        }
    }
}

/// Directory entry shown in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(flatten)]
    pub user: User,
    pub last_message: String,
    pub last_message_time: String,
    /// Replies come from the hosted AI session instead of the simulator.
    #[serde(default)]
    pub is_ai: bool,
}

impl Contact {
    pub fn id(&self) -> &UserId {
        &self.user.id
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub created_ms: i64,
    pub sender_id: UserId,
    #[serde(default, skip_serializing_if = "Reactions::is_empty")]
    pub reactions: Reactions,
}

impl Message {
    /// Creates a message with a fresh id and the current time.
    pub fn new(sender_id: UserId, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            created_ms: now_ms(),
            sender_id,
            reactions: Reactions::new(),
        }
    }

    /// Validates user input and builds the message from its trimmed text.
    pub fn compose(sender_id: UserId, text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MessagingError::EmptyText);
        }
        Ok(Self::new(sender_id, text))
    }

    /// Returns a copy with `user`'s reaction toggled to `emoji`.
    pub fn with_reaction(&self, user: &UserId, emoji: &str) -> Self {
        Self {
            reactions: self.reactions.toggled(user, emoji),
            ..self.clone()
        }
    }
}

/// Ordered message log with one contact. Messages are kept in insertion
/// order regardless of their timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub contact_id: UserId,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(contact_id: UserId) -> Self {
        Self {
            contact_id,
            messages: Vec::new(),
        }
    }

    pub fn with_messages(contact_id: UserId, messages: Vec<Message>) -> Self {
        Self {
            contact_id,
            messages,
        }
    }

    /// Returns a copy with `message` at the tail.
    pub fn appended(&self, message: Message) -> Self {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend(self.messages.iter().cloned());
        messages.push(message);
        Self::with_messages(self.contact_id.clone(), messages)
    }

    /// Applies a reaction to the message with `message_id`.
    ///
    /// Returns `None` when no message has that id, so callers can keep the
    /// existing value untouched.
    pub fn react_to_message(
        &self,
        message_id: &MessageId,
        user: &UserId,
        emoji: &str,
    ) -> Option<Self> {
        let position = self.messages.iter().position(|m| &m.id == message_id)?;
        let mut messages = self.messages.clone();
        messages[position] = self.messages[position].with_reaction(user, emoji);
        Some(Self::with_messages(self.contact_id.clone(), messages))
    }

    pub fn message(&self, message_id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == message_id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Messaging-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessagingError {
    #[error("message text is empty")]
    EmptyText,
}

pub type Result<T> = std::result::Result<T, MessagingError>;
