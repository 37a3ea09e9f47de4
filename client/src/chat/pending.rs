//! Replies that have been scheduled but not yet applied.

use glasschat_messaging::{Message, UserId};
use tokio::task::JoinHandle;
use tracing::warn;

/// Where a delivered reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Ai,
    /// The AI request failed and the fallback text was used.
    AiFallback,
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Delivered { message: Message, source: ReplySource },
    /// The chat was cleared or left before the reply arrived.
    Discarded { contact_id: UserId },
}

impl ReplyOutcome {
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Delivered { message, .. } => Some(message),
            Self::Discarded { .. } => None,
        }
    }

    pub fn source(&self) -> Option<ReplySource> {
        match self {
            Self::Delivered { source, .. } => Some(*source),
            Self::Discarded { .. } => None,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Handle to a reply task. Dropping it does not cancel the reply.
#[derive(Debug)]
pub struct PendingReply {
    contact_id: UserId,
    handle: JoinHandle<ReplyOutcome>,
}

impl PendingReply {
    pub(crate) fn new(contact_id: UserId, handle: JoinHandle<ReplyOutcome>) -> Self {
        Self { contact_id, handle }
    }

    /// Waits for the reply to be applied or dropped.
    pub async fn wait(self) -> ReplyOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(?err, contact = %self.contact_id, "reply task ended abnormally");
                ReplyOutcome::Discarded {
                    contact_id: self.contact_id,
                }
            }
        }
    }
}
