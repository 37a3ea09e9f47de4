//! Plain-text rendering of the chat screen.

use chrono::{Local, TimeZone};
use glasschat_messaging::{Contact, Conversation, Message, User, UserId};
use std::fmt::Write;

/// Local wall-clock `HH:MM` for an epoch-millisecond timestamp.
pub fn time_label(created_ms: i64) -> String {
    Local
        .timestamp_millis_opt(created_ms)
        .single()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

/// Reaction summary such as `👍 2  ❤️ 1`.
pub fn reaction_summary(message: &Message) -> String {
    message
        .reactions
        .iter()
        .map(|(emoji, count)| format!("{emoji} {count}"))
        .collect::<Vec<_>>()
        .join("  ")
}

/// One numbered line. `index` is 1-based.
pub fn message_line(index: usize, message: &Message, contact: &Contact, me: &UserId) -> String {
    let author = if &message.sender_id == me {
        "You"
    } else {
        contact.name()
    };
    let mut line = format!(
        "[{index}] {} {author}: {}",
        time_label(message.created_ms),
        message.text
    );
    let reactions = reaction_summary(message);
    if !reactions.is_empty() {
        let _ = write!(line, "   {reactions}");
    }
    line
}

pub fn conversation(contact: &Contact, conversation: Option<&Conversation>, me: &User) -> String {
    let mut out = format!("== {} ==", contact.name());
    if contact.is_ai {
        out.push_str(" (AI)");
    }
    match conversation.filter(|c| !c.is_empty()) {
        None => out.push_str("\n   no messages yet"),
        Some(conversation) => {
            for (i, message) in conversation.messages.iter().enumerate() {
                out.push('\n');
                out.push_str(&message_line(i + 1, message, contact, &me.id));
            }
        }
    }
    out
}

pub fn contact_list<'a>(
    contacts: impl IntoIterator<Item = &'a Contact>,
    active: &UserId,
) -> String {
    contacts
        .into_iter()
        .map(|c| {
            let marker = if c.id() == active { '>' } else { ' ' };
            format!(
                "{marker} {:<14} {:<18} {} ({})",
                c.id().as_str(),
                c.name(),
                c.last_message,
                c.last_message_time
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn profile(user: &User, email: &str) -> String {
    format!("{}\n{}\navatar: {}", user.name, email, user.avatar)
}
