//! Per-message emoji reactions.
//!
//! Each user holds at most one reaction on a message. Reacting with the
//! emoji the user already holds removes it; reacting with a different one
//! moves the user over.

use crate::UserId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Emoji offered by the reaction picker.
pub const REACTION_PALETTE: [&str; 6] = ["👍", "❤️", "😂", "😮", "😢", "🙏"];

/// Emoji → users who applied it.
///
/// No emoji maps to an empty set, and a user appears under one emoji at most.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, BTreeSet<UserId>>")]
pub struct Reactions(BTreeMap<String, BTreeSet<UserId>>);

impl Reactions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct emoji on the message.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The emoji `user` currently holds, if any.
    pub fn reaction_of(&self, user: &UserId) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, users)| users.contains(user))
            .map(|(emoji, _)| emoji.as_str())
    }

    pub fn users(&self, emoji: &str) -> Option<&BTreeSet<UserId>> {
        self.0.get(emoji)
    }

    pub fn count(&self, emoji: &str) -> usize {
        self.0.get(emoji).map_or(0, BTreeSet::len)
    }

    /// Emoji with their user counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(emoji, users)| (emoji.as_str(), users.len()))
    }

    /// Returns the reactions after `user` clicks `emoji`.
    pub fn toggled(&self, user: &UserId, emoji: &str) -> Self {
        let mut next = self.0.clone();

        let previous = self.reaction_of(user).map(str::to_owned);
        if let Some(previous) = &previous {
            if let Some(users) = next.get_mut(previous) {
                users.remove(user);
                if users.is_empty() {
                    next.remove(previous);
                }
            }
        }

        if previous.as_deref() != Some(emoji) {
            next.entry(emoji.to_string())
                .or_default()
                .insert(user.clone());
        }

        Self(next)
    }
}

impl From<BTreeMap<String, BTreeSet<UserId>>> for Reactions {
    /// Normalizes untrusted input: empty sets are dropped and a user listed
    /// under several emoji keeps the first one in key order.
    fn from(raw: BTreeMap<String, BTreeSet<UserId>>) -> Self {
        let mut seen = BTreeSet::new();
        let mut map = BTreeMap::new();
        for (emoji, users) in raw {
            let users: BTreeSet<UserId> = users
                .into_iter()
                .filter(|user| seen.insert(user.clone()))
                .collect();
            if !users.is_empty() {
                map.insert(emoji, users);
            }
        }
        Self(map)
    }
}
