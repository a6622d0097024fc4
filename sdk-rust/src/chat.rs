use crate::{
    ChatBackend, ChatError, ChatMessage, ChatResult, ChatRole, ChatSnapshot, ChatState,
    CredentialHolder,
};
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Hidden instruction placed first in every transcript.
pub const SYSTEM_PROMPT: &str = "You are AIdeas, an assistant that helps people brainstorm ideas. \
Answer every request with a JSON object of the form \
{\"ideas\": [{\"idea\": \"...\", \"context\": \"...\"}]} and nothing else. \
\"idea\" is one concise idea; \"context\" is a short phrase naming what the user asked for.";

/// Placeholder assistant bubble shown before the first prompt.
pub const GREETING: &str =
    "I am a helpful assistant that generates ideas for you. You can ask me to generate ideas for you.";

const MIN_PROMPT_LENGTH: usize = 5;

struct SessionState {
    state: ChatState,
    messages: Vec<ChatMessage>,
    partial: String,
}

impl SessionState {
    fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            state: self.state,
            messages: self.messages.clone(),
            partial: self.partial.clone(),
        }
    }
}

/// Owns one conversation and the reply currently streaming into it.
///
/// At most one reply streams at a time: `send_prompt` checks the state on
/// entry and rejects instead of queueing. Fragments go to a partial buffer
/// that only becomes an assistant message once the stream ends cleanly.
/// Observers follow along through [`ChatSession::subscribe`].
pub struct ChatSession {
    backend: Arc<dyn ChatBackend>,
    credentials: Arc<CredentialHolder>,
    inner: Mutex<SessionState>,
    updates: watch::Sender<ChatSnapshot>,
}

impl ChatSession {
    pub fn new(backend: Arc<dyn ChatBackend>, credentials: Arc<CredentialHolder>) -> Self {
        Self::with_system_prompt(backend, credentials, SYSTEM_PROMPT)
    }

    pub fn with_system_prompt(
        backend: Arc<dyn ChatBackend>,
        credentials: Arc<CredentialHolder>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let inner = SessionState {
            state: ChatState::Idle,
            messages: vec![ChatMessage::system(system_prompt)],
            partial: String::new(),
        };
        let (updates, _) = watch::channel(inner.snapshot());
        Self {
            backend,
            credentials,
            inner: Mutex::new(inner),
            updates,
        }
    }

    /// Receive a fresh snapshot after every state change and fragment.
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.updates.subscribe()
    }

    pub fn snapshot(&self) -> ChatSnapshot {
        self.lock().snapshot()
    }

    pub fn state(&self) -> ChatState {
        self.lock().state
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == ChatState::Streaming
    }

    /// The committed transcript, system instruction included.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().messages.clone()
    }

    /// The reply text received so far for the in-flight request.
    pub fn partial(&self) -> String {
        self.lock().partial.clone()
    }

    /// The most recent committed assistant reply, if any.
    pub fn last_reply(&self) -> Option<String> {
        self.lock()
            .messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::Assistant)
            .map(|message| message.content.clone())
    }

    /// Send `text` as the next user turn and stream the reply.
    ///
    /// Fails without touching the transcript when no API key is held or a
    /// reply is already streaming. Otherwise the user message is committed
    /// right away; the assistant message is committed only if the stream
    /// completes, and is returned. On failure the partial reply is dropped
    /// and the user message stays.
    pub async fn send_prompt(&self, text: impl Into<String>) -> ChatResult<String> {
        let text = text.into();
        let api_key = self.credentials.api_key();

        if api_key.is_empty() {
            return Err(ChatError::CredentialMissing);
        }

        let request = {
            let mut inner = self.lock();
            if inner.state == ChatState::Streaming {
                return Err(ChatError::AlreadyStreaming);
            }
            inner.messages.push(ChatMessage::user(text));
            inner.state = ChatState::Streaming;
            inner.partial.clear();
            self.publish(&inner);
            inner.messages.clone()
        };

        let mut turn = StreamingTurn::new(self);

        match self.consume(request, &api_key).await {
            Ok(()) => Ok(turn.commit()),
            Err(error) => {
                warn!(provider = self.backend.provider(), error = %error, "chat turn failed");
                turn.discard();
                Err(error)
            }
        }
    }

    async fn consume(&self, request: Vec<ChatMessage>, api_key: &str) -> ChatResult<()> {
        let mut stream = self.backend.stream(request, api_key).await?;

        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            let mut inner = self.lock();
            inner.partial.push_str(&fragment);
            self.publish(&inner);
        }

        Ok(())
    }

    fn publish(&self, inner: &SessionState) {
        // Observers may be gone; the latest snapshot is kept regardless.
        self.updates.send_replace(inner.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the session to idle however the turn ends. Dropping an
/// unfinished turn (the caller stopped awaiting) discards the partial reply.
struct StreamingTurn<'a> {
    session: &'a ChatSession,
    finished: bool,
}

impl<'a> StreamingTurn<'a> {
    fn new(session: &'a ChatSession) -> Self {
        Self {
            session,
            finished: false,
        }
    }

    fn commit(&mut self) -> String {
        self.finished = true;
        let mut inner = self.session.lock();
        let reply = std::mem::take(&mut inner.partial);
        inner.messages.push(ChatMessage::assistant(reply.clone()));
        inner.state = ChatState::Idle;
        debug!(length = reply.len(), "committed assistant reply");
        self.session.publish(&inner);
        reply
    }

    fn discard(&mut self) {
        self.finished = true;
        let mut inner = self.session.lock();
        inner.partial.clear();
        inner.state = ChatState::Idle;
        self.session.publish(&inner);
    }
}

impl Drop for StreamingTurn<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

/// Form-level check for a prompt typed into the message box.
pub fn validate_prompt_input(input: &str) -> Result<(), String> {
    if input.trim().chars().count() < MIN_PROMPT_LENGTH {
        return Err(format!(
            "The message must be at least {MIN_PROMPT_LENGTH} characters."
        ));
    }
    Ok(())
}
