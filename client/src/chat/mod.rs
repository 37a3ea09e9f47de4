//! Chat screen: sending, replies, reactions, and clearing.

mod controller;
mod pending;

pub use controller::{ChatScreen, SentMessage, UiToggles};
pub use pending::{PendingReply, ReplyOutcome, ReplySource};

use glasschat_messaging::{Message, MessageId, MessagingError, UserId};
use std::time::Duration;

use crate::config::DEFAULT_REPLY_DELAY_MS;

/// Errors that can occur on the chat screen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Messaging(#[from] MessagingError),
    #[error("unknown contact: {0}")]
    UnknownContact(UserId),
    #[error("no contacts to show")]
    EmptyDirectory,
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Delay before a regular contact's simulated reply lands.
    pub reply_delay: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(DEFAULT_REPLY_DELAY_MS),
        }
    }
}

/// State changes announced to the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageAppended { contact_id: UserId, message: Message },
    ReactionsChanged { contact_id: UserId, message_id: MessageId },
    ChatCleared { contact_id: UserId },
    TypingChanged { contact_id: UserId, typing: bool },
    ReplyDiscarded { contact_id: UserId },
    ContactSelected { contact_id: UserId },
}
