//! Chat screen controller.
//!
//! Owns the selection and the popover toggles, and turns user actions into
//! store updates and reply tasks. Shared state lives in [`ChatContext`] so
//! reply tasks can outlive the call that started them.

use super::pending::{PendingReply, ReplyOutcome, ReplySource};
use super::{ChatConfig, ChatError, ChatEvent, Result};
use crate::ai::{AiGateway, AiReply, AiSession, GatewayError};
use crate::state::ChatContext;
use glasschat_messaging::{
    Contact, Conversation, ConversationStore, Directory, Message, MessageId, User, UserId,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Open/closed state of the screen's popovers and modals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiToggles {
    pub sidebar_open: bool,
    pub chat_menu_open: bool,
    pub profile_open: bool,
    /// Message whose reaction picker is showing.
    pub reaction_picker: Option<MessageId>,
}

/// A message that was just appended, with the reply it triggered.
#[derive(Debug)]
pub struct SentMessage {
    pub message: Message,
    pub reply: PendingReply,
}

pub struct ChatScreen {
    context: Arc<ChatContext>,
    selected: Contact,
    toggles: UiToggles,
}

impl ChatScreen {
    /// Mounts a screen for `user`: seeds conversations, opens a new AI
    /// session, and selects the first contact.
    ///
    /// A missing AI credential does not fail the mount; see
    /// [`ChatScreen::ai_error`].
    pub fn mount(
        config: ChatConfig,
        directory: Directory,
        user: User,
        gateway: &AiGateway,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChatEvent>)> {
        let selected = directory.first().cloned().ok_or(ChatError::EmptyDirectory)?;
        let (context, events) = ChatContext::new(config, directory, user, gateway);
        info!(user = %context.current_user().name, "chat screen mounted");

        Ok((
            Self {
                context,
                selected,
                toggles: UiToggles::default(),
            },
            events,
        ))
    }

    pub fn current_user(&self) -> &User {
        self.context.current_user()
    }

    pub fn contacts(&self) -> &[Contact] {
        self.context.directory().contacts()
    }

    pub fn search_contacts(&self, query: &str) -> Vec<&Contact> {
        self.context.directory().search(query)
    }

    pub fn active_contact(&self) -> &Contact {
        &self.selected
    }

    pub fn ai_error(&self) -> Option<&GatewayError> {
        self.context.ai_error()
    }

    /// Short description of the assistant connection for a status line.
    pub fn ai_status(&self) -> String {
        match self.ai_error() {
            None => "assistant online".to_string(),
            Some(err) => format!("assistant offline ({err}); replies are simulated"),
        }
    }

    pub fn toggles(&self) -> &UiToggles {
        &self.toggles
    }

    pub async fn snapshot(&self) -> ConversationStore {
        self.context.snapshot().await
    }

    /// The active contact's conversation.
    pub async fn active_conversation(&self) -> Option<Arc<Conversation>> {
        self.context
            .snapshot()
            .await
            .conversation(self.selected.id())
            .cloned()
    }

    /// Switches the active contact. Replies still pending for the contact
    /// being left are dropped when they arrive.
    pub async fn select_contact(&mut self, contact_id: &UserId) -> Result<&Contact> {
        let contact = self
            .context
            .directory()
            .get(contact_id)
            .cloned()
            .ok_or_else(|| ChatError::UnknownContact(contact_id.clone()))?;

        if self.selected.id() != contact_id {
            self.context.bump_generation(self.selected.id()).await;
            self.selected = contact;
            self.toggles.chat_menu_open = false;
            self.toggles.reaction_picker = None;
            self.context.emit(ChatEvent::ContactSelected {
                contact_id: contact_id.clone(),
            });
            debug!(contact = %contact_id, "contact selected");
        }
        self.toggles.sidebar_open = false;

        Ok(self.active_contact())
    }

    /// Appends `text` to the active conversation and schedules the reply.
    ///
    /// Returns once the user's message is in the store; the reply arrives
    /// later through the event channel and the returned handle.
    pub async fn send_message(&self, text: &str) -> Result<SentMessage> {
        let contact = self.active_contact().clone();
        let message = Message::compose(self.current_user().id.clone(), text)?;
        let generation = self.context.append(contact.id(), message.clone()).await;
        debug!(contact = %contact.id(), message_id = %message.id, "message sent");

        let reply = match self.context.ai_session().filter(|_| contact.is_ai) {
            Some(session) => {
                spawn_ai_reply(&self.context, session, &contact, message.text.clone(), generation)
            }
            None => spawn_simulated_reply(&self.context, &contact, message.text.clone(), generation),
        };

        Ok(SentMessage { message, reply })
    }

    /// Toggles the signed-in user's `emoji` on a message of the active
    /// conversation. Unknown message ids are ignored.
    pub async fn react_to_message(&mut self, message_id: &MessageId, emoji: &str) -> bool {
        self.toggles.reaction_picker = None;
        self.context.react(self.selected.id(), message_id, emoji).await
    }

    /// Clears `contact_id`'s chat. The assistant keeps its greeting.
    pub async fn clear_chat(&mut self, contact_id: &UserId) {
        self.toggles.chat_menu_open = false;
        self.context.clear(contact_id).await;
        info!(contact = %contact_id, "chat cleared");
    }

    /// Whether the assistant is composing a reply in the active chat.
    pub fn is_ai_typing(&self) -> bool {
        self.selected.is_ai && self.context.is_typing(self.selected.id())
    }

    pub fn toggle_sidebar(&mut self) {
        self.toggles.sidebar_open = !self.toggles.sidebar_open;
    }

    pub fn toggle_chat_menu(&mut self) {
        self.toggles.chat_menu_open = !self.toggles.chat_menu_open;
    }

    pub fn set_profile_open(&mut self, open: bool) {
        self.toggles.profile_open = open;
    }

    pub fn open_reaction_picker(&mut self, message_id: MessageId) {
        self.toggles.reaction_picker = Some(message_id);
    }
}

fn spawn_ai_reply(
    context: &Arc<ChatContext>,
    session: Arc<AiSession>,
    contact: &Contact,
    text: String,
    generation: u64,
) -> PendingReply {
    let contact_id = contact.id().clone();
    // Both happen before returning: the indicator is visible at once and the
    // request holds its place in the session queue.
    let typing = context.begin_typing(&contact_id);
    let reply = session.send(&text);

    let context = Arc::clone(context);
    let task_contact = contact_id.clone();
    let handle = tokio::spawn(async move {
        let reply = reply.await;
        drop(typing);

        let source = if reply.is_fallback() {
            ReplySource::AiFallback
        } else {
            ReplySource::Ai
        };
        let message = Message::new(task_contact.clone(), reply.text());
        if context.deliver(&task_contact, generation, message.clone()).await {
            return ReplyOutcome::Delivered { message, source };
        }
        if let AiReply::Text(answer) = &reply {
            session.retract(&text, answer).await;
        }
        ReplyOutcome::Discarded {
            contact_id: task_contact,
        }
    });

    PendingReply::new(contact_id, handle)
}

fn spawn_simulated_reply(
    context: &Arc<ChatContext>,
    contact: &Contact,
    text: String,
    generation: u64,
) -> PendingReply {
    let contact_id = contact.id().clone();
    let delay = context.config().reply_delay;
    let context = Arc::clone(context);
    let task_contact = contact_id.clone();

    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let message = Message::new(
            task_contact.clone(),
            format!("This is a simulated response to: \"{text}\""),
        );
        if context.deliver(&task_contact, generation, message.clone()).await {
            ReplyOutcome::Delivered {
                message,
                source: ReplySource::Simulated,
            }
        } else {
            ReplyOutcome::Discarded {
                contact_id: task_contact,
            }
        }
    });

    PendingReply::new(contact_id, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::testing::ScriptedBackend;
    use crate::ai::{AiError, AiSettings, FALLBACK_REPLY, PERSONA};
    use glasschat_messaging::{AI_CONTACT_ID, AI_GREETING, CURRENT_USER_ID};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    fn id(value: &str) -> UserId {
        UserId::new(value)
    }

    fn mount_with(gateway: &AiGateway) -> (ChatScreen, mpsc::UnboundedReceiver<ChatEvent>) {
        ChatScreen::mount(
            ChatConfig::default(),
            Directory::builtin(),
            User::signed_in("Ada"),
            gateway,
        )
        .unwrap()
    }

    fn offline_gateway() -> AiGateway {
        AiGateway::new(AiSettings::default())
    }

    fn texts(conversation: &Conversation) -> Vec<(&str, &str)> {
        conversation
            .messages
            .iter()
            .map(|m| (m.text.as_str(), m.sender_id.as_str()))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_reply_after_fixed_delay() {
        let gateway = offline_gateway();
        let (mut screen, _events) = mount_with(&gateway);
        screen.select_contact(&id("3")).await.unwrap();
        screen.clear_chat(&id("3")).await;

        let started = Instant::now();
        let sent = screen.send_message("Can you send over the file?").await.unwrap();

        let conversation = screen.active_conversation().await.unwrap();
        assert_eq!(
            texts(&conversation),
            [("Can you send over the file?", CURRENT_USER_ID)]
        );

        let outcome = sent.reply.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(outcome.source(), Some(ReplySource::Simulated));

        let conversation = screen.active_conversation().await.unwrap();
        assert_eq!(
            texts(&conversation),
            [
                ("Can you send over the file?", CURRENT_USER_ID),
                (
                    "This is a simulated response to: \"Can you send over the file?\"",
                    "3"
                ),
            ]
        );
        assert!(!screen.is_ai_typing());
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_changes() {
        let gateway = offline_gateway();
        let (screen, _events) = mount_with(&gateway);
        let before = screen.snapshot().await;

        let err = screen.send_message("   ").await.unwrap_err();
        assert!(matches!(err, ChatError::Messaging(_)));
        assert!(screen.snapshot().await.same_as(&before));
    }

    #[tokio::test]
    async fn ai_reply_toggles_typing_around_resolution() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            ScriptedBackend::new([Ok("Hi Ada!".to_string())]).gated(Arc::clone(&gate)),
        );
        let gateway = AiGateway::with_backend(backend, PERSONA);
        let (screen, mut events) = mount_with(&gateway);
        assert_eq!(screen.active_contact().id().as_str(), AI_CONTACT_ID);

        let sent = screen.send_message("hello").await.unwrap();
        assert!(screen.is_ai_typing());
        let conversation = screen.active_conversation().await.unwrap();
        assert_eq!(conversation.len(), 2);

        gate.notify_one();
        let outcome = sent.reply.wait().await;
        assert_eq!(outcome.source(), Some(ReplySource::Ai));
        assert!(!screen.is_ai_typing());

        let conversation = screen.active_conversation().await.unwrap();
        assert_eq!(
            texts(&conversation),
            [
                (AI_GREETING, AI_CONTACT_ID),
                ("hello", CURRENT_USER_ID),
                ("Hi Ada!", AI_CONTACT_ID)
            ]
        );

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        let typing: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                ChatEvent::TypingChanged { typing, .. } => Some(*typing),
                _ => None,
            })
            .collect();
        assert_eq!(typing, [true, false]);
        assert!(matches!(
            seen.last(),
            Some(ChatEvent::MessageAppended { message, .. }) if message.text == "Hi Ada!"
        ));
    }

    #[tokio::test]
    async fn ai_failure_delivers_fallback_text() {
        let backend = Arc::new(ScriptedBackend::new([Err(AiError::Transport(
            "connection reset".into(),
        ))]));
        let gateway = AiGateway::with_backend(backend, PERSONA);
        let (screen, _events) = mount_with(&gateway);

        let outcome = screen.send_message("hi").await.unwrap().reply.wait().await;
        assert_eq!(outcome.source(), Some(ReplySource::AiFallback));
        assert_eq!(outcome.message().unwrap().text, FALLBACK_REPLY);
        assert_eq!(
            outcome.message().unwrap().sender_id.as_str(),
            AI_CONTACT_ID
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_session_falls_back_to_simulated_reply() {
        let gateway = offline_gateway();
        let (screen, _events) = mount_with(&gateway);
        assert_eq!(screen.ai_error(), Some(&GatewayError::MissingApiKey));

        let sent = screen.send_message("anyone there?").await.unwrap();
        assert!(!screen.is_ai_typing());
        let outcome = sent.reply.wait().await;
        assert_eq!(outcome.source(), Some(ReplySource::Simulated));
        assert_eq!(outcome.message().unwrap().sender_id.as_str(), AI_CONTACT_ID);
    }

    #[tokio::test]
    async fn clearing_during_ai_reply_discards_it() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            ScriptedBackend::new([Ok("too late".to_string())]).gated(Arc::clone(&gate)),
        );
        let gateway = AiGateway::with_backend(backend, PERSONA);
        let (mut screen, _events) = mount_with(&gateway);

        let sent = screen.send_message("question").await.unwrap();
        screen.clear_chat(&id(AI_CONTACT_ID)).await;
        gate.notify_one();

        let outcome = sent.reply.wait().await;
        assert_eq!(
            outcome,
            ReplyOutcome::Discarded {
                contact_id: id(AI_CONTACT_ID)
            }
        );
        assert!(!screen.is_ai_typing());

        let conversation = screen.active_conversation().await.unwrap();
        assert_eq!(texts(&conversation), [(AI_GREETING, AI_CONTACT_ID)]);

        // The unseen exchange is not part of the assistant's context.
        let session = screen.context.ai_session().unwrap();
        assert!(session.history().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn overlapping_ai_sends_keep_submission_order() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            ScriptedBackend::new([Ok("r0".to_string()), Ok("r1".to_string())])
                .gated(Arc::clone(&gate)),
        );
        let gateway = AiGateway::with_backend(backend.clone(), PERSONA);
        let (screen, mut events) = mount_with(&gateway);
        let screen = Arc::new(screen);

        let sender = Arc::clone(&screen);
        let (first, second) = tokio::spawn(async move {
            let first = sender.send_message("first").await.unwrap();
            let second = sender.send_message("second").await.unwrap();
            (first, second)
        })
        .await
        .unwrap();
        assert!(screen.is_ai_typing());

        gate.notify_one();
        let outcome = first.reply.wait().await;
        assert_eq!(outcome.message().unwrap().text, "r0");
        assert!(screen.is_ai_typing());

        gate.notify_one();
        let outcome = second.reply.wait().await;
        assert_eq!(outcome.message().unwrap().text, "r1");
        assert!(!screen.is_ai_typing());

        let calls = backend.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].last().unwrap().text, "first");
        assert_eq!(
            calls[1].iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            ["first", "r0", "second"]
        );

        let conversation = screen.active_conversation().await.unwrap();
        assert_eq!(
            texts(&conversation),
            [
                (AI_GREETING, AI_CONTACT_ID),
                ("first", CURRENT_USER_ID),
                ("second", CURRENT_USER_ID),
                ("r0", AI_CONTACT_ID),
                ("r1", AI_CONTACT_ID),
            ]
        );

        let typing: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|e| match e {
                ChatEvent::TypingChanged { typing, .. } => Some(typing),
                _ => None,
            })
            .collect();
        assert_eq!(typing, [true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_a_chat_discards_its_pending_reply() {
        let gateway = offline_gateway();
        let (mut screen, _events) = mount_with(&gateway);
        screen.select_contact(&id("2")).await.unwrap();

        let sent = screen.send_message("lunch?").await.unwrap();
        screen.select_contact(&id("3")).await.unwrap();

        assert!(!sent.reply.wait().await.is_delivered());
        let alice = screen.snapshot().await;
        assert_eq!(alice.messages(&id("2")).last().unwrap().text, "lunch?");
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_sends_each_get_one_reply() {
        let gateway = offline_gateway();
        let (mut screen, _events) = mount_with(&gateway);
        screen.select_contact(&id("4")).await.unwrap();

        let first = screen.send_message("one").await.unwrap();
        let second = screen.send_message("two").await.unwrap();
        first.reply.wait().await;
        second.reply.wait().await;

        let charlie = screen.active_conversation().await.unwrap();
        let senders: Vec<_> = charlie.messages.iter().map(|m| m.sender_id.as_str()).collect();
        assert_eq!(senders, [CURRENT_USER_ID, CURRENT_USER_ID, "4", "4"]);
    }

    #[tokio::test]
    async fn reactions_toggle_on_active_chat_only() {
        let gateway = offline_gateway();
        let (mut screen, mut events) = mount_with(&gateway);
        screen.select_contact(&id("2")).await.unwrap();
        let target = MessageId::new("alice-msg-1");
        let me = id(CURRENT_USER_ID);

        screen.open_reaction_picker(target.clone());
        assert!(screen.react_to_message(&target, "👍").await);
        assert_eq!(screen.toggles().reaction_picker, None);

        let reactions = |store: &ConversationStore| {
            store.conversation(&id("2")).unwrap().message(&target).unwrap().reactions.clone()
        };
        let after_like = reactions(&screen.snapshot().await);
        assert_eq!(after_like.reaction_of(&me), Some("👍"));

        screen.react_to_message(&target, "👍").await;
        assert!(reactions(&screen.snapshot().await).is_empty());

        screen.react_to_message(&target, "❤️").await;
        let hearted = reactions(&screen.snapshot().await);
        assert_eq!(hearted.reaction_of(&me), Some("❤️"));
        assert_eq!(hearted.len(), 1);

        assert!(!screen.react_to_message(&MessageId::new("bob-msg-1"), "👍").await);

        let mut changed = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, ChatEvent::ReactionsChanged { .. }) {
                changed += 1;
            }
        }
        assert_eq!(changed, 3);
    }

    #[tokio::test]
    async fn selection_rules() {
        let gateway = offline_gateway();
        let (mut screen, _events) = mount_with(&gateway);

        screen.toggle_sidebar();
        screen.toggle_chat_menu();
        let contact = screen.select_contact(&id("5")).await.unwrap();
        assert_eq!(contact.name(), "Diana Prince");
        assert_eq!(screen.toggles(), &UiToggles::default());

        let err = screen.select_contact(&id("42")).await.unwrap_err();
        assert_eq!(err, ChatError::UnknownContact(id("42")));
        assert_eq!(screen.active_contact().id().as_str(), "5");
        assert!(!screen.is_ai_typing());
    }

    #[tokio::test]
    async fn clear_regular_chat_empties_it() {
        let gateway = offline_gateway();
        let (mut screen, _events) = mount_with(&gateway);
        screen.toggle_chat_menu();

        screen.clear_chat(&id("2")).await;
        assert!(screen.snapshot().await.messages(&id("2")).is_empty());
        assert!(!screen.toggles().chat_menu_open);
        assert_eq!(screen.snapshot().await.messages(&id("3")).len(), 1);
    }
}
