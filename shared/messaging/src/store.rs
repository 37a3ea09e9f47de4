//! Immutable conversation store.
//!
//! Every update returns a new store. Conversations that an update does not
//! touch are shared with the previous store, so callers can detect changes
//! with [`ConversationStore::same_as`] or `Arc::ptr_eq` on a conversation.

use crate::directory::{seed_conversations, Directory};
use crate::{now_ms, Conversation, Message, MessageId, UserId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

type ConversationMap = BTreeMap<UserId, Arc<Conversation>>;

#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Arc<ConversationMap>,
    seed: Arc<ConversationMap>,
    ai_contacts: Arc<BTreeSet<UserId>>,
}

impl ConversationStore {
    /// Builds a store from its seed conversations. Clearing a contact listed
    /// in `ai_contacts` restores its seed messages instead of emptying it.
    pub fn new(seed: Vec<Conversation>, ai_contacts: impl IntoIterator<Item = UserId>) -> Self {
        let seed: ConversationMap = seed
            .into_iter()
            .map(|c| (c.contact_id.clone(), Arc::new(c)))
            .collect();
        let seed = Arc::new(seed);
        Self {
            conversations: Arc::clone(&seed),
            seed,
            ai_contacts: Arc::new(ai_contacts.into_iter().collect()),
        }
    }

    /// Store seeded from `directory`'s canned conversations.
    pub fn seeded(directory: &Directory) -> Self {
        Self::new(
            seed_conversations(directory, now_ms()),
            directory.ai_contacts().map(|c| c.id().clone()),
        )
    }

    pub fn conversation(&self, contact_id: &UserId) -> Option<&Arc<Conversation>> {
        self.conversations.get(contact_id)
    }

    /// Messages exchanged with `contact_id`; empty for unknown contacts.
    pub fn messages(&self, contact_id: &UserId) -> &[Message] {
        self.conversations
            .get(contact_id)
            .map(|c| c.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// `true` when both values are the same snapshot.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conversations, &other.conversations)
    }

    /// Appends `message` to the tail of `contact_id`'s conversation.
    /// Unknown contacts leave the store unchanged.
    pub fn append_message(&self, contact_id: &UserId, message: Message) -> Self {
        match self.conversations.get(contact_id) {
            Some(current) => self.replace(contact_id, current.appended(message)),
            None => self.clone(),
        }
    }

    /// Resets `contact_id`'s conversation: AI contacts go back to their seed
    /// messages, everyone else to an empty log. Unknown contacts are ignored.
    pub fn clear_conversation(&self, contact_id: &UserId) -> Self {
        if !self.conversations.contains_key(contact_id) {
            return self.clone();
        }

        let messages = if self.ai_contacts.contains(contact_id) {
            self.seed
                .get(contact_id)
                .map(|c| c.messages.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        self.replace(
            contact_id,
            Conversation::with_messages(contact_id.clone(), messages),
        )
    }

    /// Toggles `user`'s `emoji` reaction on one message of one conversation.
    pub fn react(
        &self,
        contact_id: &UserId,
        message_id: &MessageId,
        user: &UserId,
        emoji: &str,
    ) -> Self {
        let updated = self
            .conversations
            .get(contact_id)
            .and_then(|c| c.react_to_message(message_id, user, emoji));
        match updated {
            Some(conversation) => self.replace(contact_id, conversation),
            None => self.clone(),
        }
    }

    fn replace(&self, contact_id: &UserId, conversation: Conversation) -> Self {
        let mut conversations = (*self.conversations).clone();
        conversations.insert(contact_id.clone(), Arc::new(conversation));
        Self {
            conversations: Arc::new(conversations),
            seed: Arc::clone(&self.seed),
            ai_contacts: Arc::clone(&self.ai_contacts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AI_CONTACT_ID, CURRENT_USER_ID};

    fn id(value: &str) -> UserId {
        UserId::new(value)
    }

    fn store() -> ConversationStore {
        ConversationStore::seeded(&Directory::builtin())
    }

    #[test]
    fn append_touches_only_target_conversation() {
        let before = store();
        let after = before.append_message(&id("3"), Message::new(id(CURRENT_USER_ID), "hello"));

        assert!(!after.same_as(&before));
        assert_eq!(after.messages(&id("3")).len(), 2);
        assert_eq!(after.messages(&id("3"))[1].text, "hello");
        assert_eq!(before.messages(&id("3")).len(), 1);

        assert!(Arc::ptr_eq(
            before.conversation(&id("2")).unwrap(),
            after.conversation(&id("2")).unwrap()
        ));
    }

    #[test]
    fn append_to_unknown_contact_is_noop() {
        let before = store();
        let after = before.append_message(&id("99"), Message::new(id(CURRENT_USER_ID), "hi"));
        assert!(after.same_as(&before));
        assert!(after.conversation(&id("99")).is_none());
    }

    #[test]
    fn clear_ai_contact_restores_greeting() {
        let seeded = store();
        let greeting = seeded.messages(&id(AI_CONTACT_ID)).to_vec();

        let cleared = seeded
            .append_message(&id(AI_CONTACT_ID), Message::new(id(CURRENT_USER_ID), "q"))
            .append_message(&id(AI_CONTACT_ID), Message::new(id(AI_CONTACT_ID), "a"))
            .clear_conversation(&id(AI_CONTACT_ID));

        assert_eq!(cleared.messages(&id(AI_CONTACT_ID)), greeting.as_slice());
    }

    #[test]
    fn clear_regular_contact_empties_it() {
        let cleared = store().clear_conversation(&id("2"));
        assert!(cleared.messages(&id("2")).is_empty());
        assert!(cleared.conversation(&id("2")).is_some());
        assert_eq!(cleared.messages(&id("3")).len(), 1);
    }

    #[test]
    fn clear_unknown_contact_is_noop() {
        let before = store();
        assert!(before.clear_conversation(&id("nobody")).same_as(&before));
    }

    #[test]
    fn react_updates_one_message_only() {
        let before = store();
        let target = MessageId::new("alice-msg-1");
        let after = before.react(&id("2"), &target, &id(CURRENT_USER_ID), "👍");

        let alice = after.conversation(&id("2")).unwrap();
        assert_eq!(alice.message(&target).unwrap().reactions.count("👍"), 1);
        assert!(alice.messages[1].reactions.is_empty());
        assert!(Arc::ptr_eq(
            before.conversation(&id("3")).unwrap(),
            after.conversation(&id("3")).unwrap()
        ));
    }

    #[test]
    fn react_to_message_in_other_conversation_is_noop() {
        let before = store();
        let after = before.react(
            &id("3"),
            &MessageId::new("alice-msg-1"),
            &id(CURRENT_USER_ID),
            "👍",
        );
        assert!(after.same_as(&before));
    }
}
