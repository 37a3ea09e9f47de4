//! Sessions with the hosted AI assistant.
//!
//! A chat screen opens one [`AiSession`] when it mounts and keeps it until
//! it goes away. The session owns the conversation history sent with every
//! request; transport failures never escape [`AiSession::send`], they come
//! back as [`AiReply::Fallback`].

mod gemini;

pub use gemini::GeminiBackend;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const PERSONA: &str = "You are a friendly and helpful chat assistant named Gemini. \
Keep your responses concise and conversational.";

/// Text shown in place of an assistant reply when the request failed.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Author of a turn in the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A chat-completion service. Receives the full history, the last turn
/// being the new user message, and returns the assistant's text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn generate(&self, persona: &str, history: &[Turn]) -> Result<String, AiError>;
}

/// Failure of a single request to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("response contained no text")]
    EmptyResponse,
}

/// The AI session could not be created. Nothing retries this.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,
    #[error("failed to build AI client: {0}")]
    Client(String),
}

/// Outcome of [`AiSession::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiReply {
    Text(String),
    /// The request failed; the user sees [`FALLBACK_REPLY`].
    Fallback { reason: String },
}

impl AiReply {
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Fallback { .. } => FALLBACK_REPLY,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub persona: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            persona: PERSONA.to_string(),
        }
    }
}

/// Hands out AI sessions. The backend client is built on first use and
/// shared by every session the gateway creates afterwards.
pub struct AiGateway {
    settings: AiSettings,
    backend: OnceCell<Arc<dyn ChatBackend>>,
}

impl AiGateway {
    pub fn new(settings: AiSettings) -> Self {
        Self {
            settings,
            backend: OnceCell::new(),
        }
    }

    /// Gateway over an already constructed backend.
    pub fn with_backend(backend: Arc<dyn ChatBackend>, persona: impl Into<String>) -> Self {
        Self {
            settings: AiSettings {
                persona: persona.into(),
                ..AiSettings::default()
            },
            backend: OnceCell::with_value(backend),
        }
    }

    /// Opens a fresh session bound to the configured persona.
    ///
    /// Must be called inside a tokio runtime: the session's worker task is
    /// spawned here.
    pub fn create_session(&self) -> Result<AiSession, GatewayError> {
        let backend = self.backend()?;
        debug!(model = %self.settings.model, "AI session created");
        Ok(AiSession::start(backend, self.settings.persona.clone()))
    }

    fn backend(&self) -> Result<Arc<dyn ChatBackend>, GatewayError> {
        self.backend
            .get_or_try_init(|| {
                let api_key = self
                    .settings
                    .api_key
                    .as_deref()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(GatewayError::MissingApiKey)?;
                let backend = GeminiBackend::new(api_key, &self.settings.model)?;
                Ok(Arc::new(backend) as Arc<dyn ChatBackend>)
            })
            .map(Arc::clone)
    }
}

struct Request {
    text: String,
    reply: oneshot::Sender<AiReply>,
}

/// Multi-turn conversation with the assistant.
///
/// Requests are queued when [`AiSession::send`] is called and answered one
/// at a time by the session's worker, so exchanges reach the backend and
/// the history in call order.
pub struct AiSession {
    persona: String,
    history: Arc<Mutex<Vec<Turn>>>,
    requests: mpsc::UnboundedSender<Request>,
}

impl AiSession {
    fn start(backend: Arc<dyn ChatBackend>, persona: String) -> Self {
        let history = Arc::new(Mutex::new(Vec::new()));
        let (requests, queue) = mpsc::unbounded_channel();
        tokio::spawn(serve(
            backend,
            persona.clone(),
            Arc::clone(&history),
            queue,
        ));
        Self {
            persona,
            history,
            requests,
        }
    }

    /// Queues `text` and returns a future for the reply. The request's
    /// place in the queue is taken before this returns, not when the future
    /// is first polled.
    pub fn send(&self, text: &str) -> impl Future<Output = AiReply> + Send + 'static {
        let (reply, answer) = oneshot::channel();
        let queued = self.requests.send(Request {
            text: text.to_string(),
            reply,
        });

        async move {
            if queued.is_err() {
                return session_closed();
            }
            answer.await.unwrap_or_else(|_| session_closed())
        }
    }

    /// Removes a completed exchange whose reply was never shown, so later
    /// requests do not build on it.
    pub async fn retract(&self, text: &str, reply: &str) -> bool {
        let mut history = self.history.lock().await;
        let position = history.windows(2).rposition(|pair| {
            pair[0] == Turn::user(text) && pair[1] == Turn::model(reply)
        });
        match position {
            Some(index) => {
                history.drain(index..index + 2);
                debug!(turns = history.len(), "exchange retracted from AI history");
                true
            }
            None => false,
        }
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.history.lock().await.clone()
    }
}

fn session_closed() -> AiReply {
    error!("AI session worker is gone");
    AiReply::Fallback {
        reason: "AI session closed".to_string(),
    }
}

/// Answers queued requests in order until the session is dropped.
async fn serve(
    backend: Arc<dyn ChatBackend>,
    persona: String,
    history: Arc<Mutex<Vec<Turn>>>,
    mut queue: mpsc::UnboundedReceiver<Request>,
) {
    while let Some(request) = queue.recv().await {
        let reply = exchange(backend.as_ref(), &persona, &history, &request.text).await;
        // The caller may have stopped waiting; the exchange stays recorded.
        let _ = request.reply.send(reply);
    }
    debug!("AI session worker stopped");
}

async fn exchange(
    backend: &dyn ChatBackend,
    persona: &str,
    history: &Mutex<Vec<Turn>>,
    text: &str,
) -> AiReply {
    let mut history = history.lock().await;
    history.push(Turn::user(text));

    match backend.generate(persona, &history).await {
        Ok(reply) => {
            history.push(Turn::model(reply.clone()));
            AiReply::Text(reply)
        }
        Err(err) => {
            // Failed turns are not part of the conversation.
            history.pop();
            error!(%err, "error sending message to AI");
            AiReply::Fallback {
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    /// Backend that answers from a script and records what it was sent.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: StdMutex<VecDeque<Result<String, AiError>>>,
        pub calls: StdMutex<Vec<Vec<Turn>>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: impl IntoIterator<Item = Result<String, AiError>>) -> Self {
            Self {
                replies: StdMutex::new(replies.into_iter().collect()),
                ..Self::default()
            }
        }

        /// Every call waits for a `notify_one` on `gate` before answering.
        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn generate(&self, _persona: &str, history: &[Turn]) -> Result<String, AiError> {
            self.calls.lock().unwrap().push(history.to_vec());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AiError::EmptyResponse))
        }
    }
}
