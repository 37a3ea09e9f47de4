//! Static contact catalog and the conversations it starts with.

use crate::{Contact, Conversation, Message, MessageId, User, UserId};

/// Id of the built-in AI assistant contact.
pub const AI_CONTACT_ID: &str = "ai-assistant";

/// Id carried by the signed-in user on every chat screen.
pub const CURRENT_USER_ID: &str = "user";

/// Greeting the AI assistant opens with, and returns to after a clear.
pub const AI_GREETING: &str =
    "Hello! I am your AI Assistant powered by Gemini. How can I help you today?";

/// Read-only list of chat participants.
#[derive(Debug, Clone)]
pub struct Directory {
    contacts: Vec<Contact>,
}

impl Directory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// The catalog the client ships with.
    pub fn builtin() -> Self {
        Self::new(vec![
            contact(AI_CONTACT_ID, "Gemini Assistant", "ai", "Ask me anything!", "Online", true),
            contact("2", "Alice Johnson", "alice", "Sounds good! See you then.", "11:42 AM", false),
            contact("3", "Bob Williams", "bob", "Can you send over the file?", "10:58 AM", false),
            contact("4", "Charlie Brown", "charlie", "Haha, that's hilarious!", "Yesterday", false),
            contact("5", "Diana Prince", "diana", "I'll look into it.", "Yesterday", false),
        ])
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, id: &UserId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id() == id)
    }

    /// Contact selected when a chat screen opens.
    pub fn first(&self) -> Option<&Contact> {
        self.contacts.first()
    }

    pub fn ai_contacts(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.iter().filter(|c| c.is_ai)
    }

    /// Case-insensitive substring match on display names. An empty query
    /// returns every contact.
    pub fn search(&self, query: &str) -> Vec<&Contact> {
        let needle = query.to_lowercase();
        self.contacts
            .iter()
            .filter(|c| c.name().to_lowercase().contains(&needle))
            .collect()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::builtin()
    }
}

fn contact(id: &str, name: &str, slug: &str, preview: &str, time: &str, is_ai: bool) -> Contact {
    Contact {
        user: User {
            id: UserId::new(id),
            name: name.to_string(),
            avatar: format!("https://i.pravatar.cc/150?u={slug}"),
        },
        last_message: preview.to_string(),
        last_message_time: time.to_string(),
        is_ai,
    }
}

fn seeded(id: &str, sender: &str, text: &str, created_ms: i64) -> Message {
    Message {
        id: MessageId::new(id),
        text: text.to_string(),
        created_ms,
        sender_id: UserId::new(sender),
        reactions: Default::default(),
    }
}

/// Initial conversations for every contact in `directory`, timestamped
/// relative to `now_ms`.
///
/// Contacts without canned history start with an empty log.
pub fn seed_conversations(directory: &Directory, now_ms: i64) -> Vec<Conversation> {
    directory
        .contacts()
        .iter()
        .map(|c| {
            let messages = match c.id().as_str() {
                AI_CONTACT_ID => vec![seeded("ai-msg-1", AI_CONTACT_ID, AI_GREETING, now_ms)],
                "2" => vec![
                    seeded(
                        "alice-msg-1",
                        "2",
                        "Hey, are we still on for lunch tomorrow?",
                        now_ms - 100_000,
                    ),
                    seeded(
                        "user-msg-1",
                        CURRENT_USER_ID,
                        "Yes, absolutely! The usual spot at 1 PM?",
                        now_ms - 90_000,
                    ),
                    seeded("alice-msg-2", "2", "Sounds good! See you then.", now_ms - 80_000),
                ],
                "3" => vec![seeded(
                    "bob-msg-1",
                    "3",
                    "Can you send over the file?",
                    now_ms - 200_000,
                )],
                _ => Vec::new(),
            };
            Conversation::with_messages(c.id().clone(), messages)
        })
        .collect()
}
