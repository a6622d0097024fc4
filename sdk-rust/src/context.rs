use crate::{
    storage::KeyValueStore, ChatBackend, ChatSession, CredentialHolder, IdeaBindings,
    IdeaServiceSelector,
};
use std::sync::Arc;

pub struct AppContextOptions {
    /// Device-local storage for the local idea store.
    pub store: Arc<dyn KeyValueStore>,
    /// Origin of the ideas API used once a user signs in.
    pub api_base_url: String,
    pub backend: Arc<dyn ChatBackend>,
    /// Key to start with; the user is asked for one when absent.
    pub api_key: Option<String>,
}

/// Shared state for one user session: the held API key, the active idea
/// store and the idea bindings. Components receive the pieces they need from
/// here and mutate them only through their own setters.
pub struct AppContext {
    credentials: Arc<CredentialHolder>,
    selector: Arc<IdeaServiceSelector>,
    ideas: Arc<IdeaBindings>,
    backend: Arc<dyn ChatBackend>,
}

impl AppContext {
    pub fn new(options: AppContextOptions) -> Self {
        let AppContextOptions {
            store,
            api_base_url,
            backend,
            api_key,
        } = options;

        let credentials = Arc::new(CredentialHolder::with_api_key(api_key.unwrap_or_default()));
        let selector = Arc::new(IdeaServiceSelector::new(store, api_base_url));
        let ideas = Arc::new(IdeaBindings::new(selector.clone()));

        Self {
            credentials,
            selector,
            ideas,
            backend,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialHolder> {
        &self.credentials
    }

    pub fn selector(&self) -> &Arc<IdeaServiceSelector> {
        &self.selector
    }

    pub fn ideas(&self) -> &Arc<IdeaBindings> {
        &self.ideas
    }

    /// Start a conversation that uses this context's backend and key.
    pub fn chat_session(&self) -> ChatSession {
        ChatSession::new(self.backend.clone(), self.credentials.clone())
    }

    /// Route idea storage to the account behind `session_token`. Cached
    /// lists are marked stale since they may belong to someone else.
    pub fn sign_in(&self, session_token: impl Into<String>) {
        self.selector.set_remote(session_token);
        self.ideas.invalidate();
    }

    /// Route idea storage back to this device.
    pub fn sign_out(&self) {
        self.selector.set_local();
        self.ideas.invalidate();
    }
}
