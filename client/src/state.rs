//! State shared between a chat screen and the reply tasks it spawns.

use crate::ai::{AiGateway, AiSession, GatewayError};
use crate::chat::{ChatConfig, ChatEvent};
use glasschat_messaging::{ConversationStore, Directory, Message, MessageId, User, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

/// Everything guarded together so a reply can check its generation and
/// append in one step.
#[derive(Debug)]
struct Conversations {
    store: ConversationStore,
    /// Bumped whenever a conversation is cleared or left. Replies started
    /// under an older generation are dropped.
    generations: HashMap<UserId, u64>,
}

impl Conversations {
    fn generation(&self, contact_id: &UserId) -> u64 {
        self.generations.get(contact_id).copied().unwrap_or(0)
    }
}

pub struct ChatContext {
    config: ChatConfig,
    directory: Directory,
    current_user: User,
    conversations: RwLock<Conversations>,
    /// Outstanding AI requests per contact. Never held across an await.
    typing: Mutex<HashMap<UserId, usize>>,
    ai: Result<Arc<AiSession>, GatewayError>,
    events: mpsc::UnboundedSender<ChatEvent>,
}

impl ChatContext {
    /// Seeds the conversation store and opens this screen's AI session.
    pub fn new(
        config: ChatConfig,
        directory: Directory,
        current_user: User,
        gateway: &AiGateway,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ChatEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();

        let ai = gateway.create_session().map(Arc::new);
        if let Err(err) = &ai {
            warn!(%err, "AI session unavailable; assistant will use simulated replies");
        }

        let context = Self {
            config,
            conversations: RwLock::new(Conversations {
                store: ConversationStore::seeded(&directory),
                generations: HashMap::new(),
            }),
            typing: Mutex::new(HashMap::new()),
            directory,
            current_user,
            ai,
            events,
        };

        (Arc::new(context), events_rx)
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn current_user(&self) -> &User {
        &self.current_user
    }

    pub fn ai_session(&self) -> Option<Arc<AiSession>> {
        self.ai.as_ref().ok().cloned()
    }

    /// Why the AI session could not be opened, if it could not.
    pub fn ai_error(&self) -> Option<&GatewayError> {
        self.ai.as_ref().err()
    }

    /// Current store value. Cheap: conversations are shared, not copied.
    pub async fn snapshot(&self) -> ConversationStore {
        self.conversations.read().await.store.clone()
    }

    /// Appends a message and returns the conversation's generation at that
    /// moment.
    pub async fn append(&self, contact_id: &UserId, message: Message) -> u64 {
        let generation = {
            let mut state = self.conversations.write().await;
            state.store = state.store.append_message(contact_id, message.clone());
            state.generation(contact_id)
        };
        self.emit(ChatEvent::MessageAppended {
            contact_id: contact_id.clone(),
            message,
        });
        generation
    }

    /// Appends a reply unless the conversation moved past `generation`.
    pub async fn deliver(&self, contact_id: &UserId, generation: u64, message: Message) -> bool {
        {
            let mut state = self.conversations.write().await;
            let current = state.generation(contact_id);
            if current != generation {
                debug!(contact = %contact_id, generation, current, "discarding stale reply");
                drop(state);
                self.emit(ChatEvent::ReplyDiscarded {
                    contact_id: contact_id.clone(),
                });
                return false;
            }
            state.store = state.store.append_message(contact_id, message.clone());
        }
        self.emit(ChatEvent::MessageAppended {
            contact_id: contact_id.clone(),
            message,
        });
        true
    }

    /// Toggles the current user's reaction. Returns whether anything changed.
    pub async fn react(&self, contact_id: &UserId, message_id: &MessageId, emoji: &str) -> bool {
        let changed = {
            let mut state = self.conversations.write().await;
            let next = state
                .store
                .react(contact_id, message_id, &self.current_user.id, emoji);
            let changed = !next.same_as(&state.store);
            state.store = next;
            changed
        };
        if changed {
            self.emit(ChatEvent::ReactionsChanged {
                contact_id: contact_id.clone(),
                message_id: message_id.clone(),
            });
        }
        changed
    }

    /// Resets a conversation and invalidates its in-flight replies.
    pub async fn clear(&self, contact_id: &UserId) {
        let known = {
            let mut state = self.conversations.write().await;
            *state.generations.entry(contact_id.clone()).or_insert(0) += 1;
            let next = state.store.clear_conversation(contact_id);
            let known = state.store.conversation(contact_id).is_some();
            state.store = next;
            known
        };
        if known {
            self.emit(ChatEvent::ChatCleared {
                contact_id: contact_id.clone(),
            });
        }
    }

    /// Invalidates in-flight replies without touching the messages.
    pub async fn bump_generation(&self, contact_id: &UserId) {
        let mut state = self.conversations.write().await;
        *state.generations.entry(contact_id.clone()).or_insert(0) += 1;
    }

    /// Marks one more AI request outstanding for `contact_id`. The count
    /// drops again when the returned guard is dropped, even if the task
    /// holding it panics.
    pub fn begin_typing(self: &Arc<Self>, contact_id: &UserId) -> TypingGuard {
        let started = {
            let mut typing = self.typing.lock().unwrap_or_else(PoisonError::into_inner);
            let count = typing.entry(contact_id.clone()).or_insert(0);
            *count += 1;
            *count == 1
        };
        if started {
            self.emit(ChatEvent::TypingChanged {
                contact_id: contact_id.clone(),
                typing: true,
            });
        }
        TypingGuard {
            context: Arc::clone(self),
            contact_id: contact_id.clone(),
        }
    }

    fn end_typing(&self, contact_id: &UserId) {
        let stopped = {
            let mut typing = self.typing.lock().unwrap_or_else(PoisonError::into_inner);
            match typing.get_mut(contact_id) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    typing.remove(contact_id);
                    true
                }
                None => false,
            }
        };
        if stopped {
            self.emit(ChatEvent::TypingChanged {
                contact_id: contact_id.clone(),
                typing: false,
            });
        }
    }

    pub fn is_typing(&self, contact_id: &UserId) -> bool {
        self.typing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(contact_id)
    }

    pub(crate) fn emit(&self, event: ChatEvent) {
        // The front end may have gone away; replies still land in the store.
        let _ = self.events.send(event);
    }
}

/// One outstanding AI request; see [`ChatContext::begin_typing`].
pub struct TypingGuard {
    context: Arc<ChatContext>,
    contact_id: UserId,
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        self.context.end_typing(&self.contact_id);
    }
}
