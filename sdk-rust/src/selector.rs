use crate::{
    storage::KeyValueStore, IdeaService, LocalIdeaService, RemoteIdeaService,
    RemoteIdeaServiceOptions,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Which persistence variant is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaServiceMode {
    Local,
    Remote,
}

impl IdeaServiceMode {
    /// Cache key the display layer uses for this mode's idea list.
    pub fn query_key(self) -> &'static str {
        match self {
            IdeaServiceMode::Local => "local-ideas",
            IdeaServiceMode::Remote => "ideas",
        }
    }
}

struct ActiveService {
    mode: IdeaServiceMode,
    service: Arc<dyn IdeaService>,
}

/// Holds the idea service every operation currently routes to.
///
/// Switching swaps the instance for subsequent calls only. Calls already
/// running against the previous instance finish there, and no data moves
/// between variants, so callers re-fetch after a switch.
pub struct IdeaServiceSelector {
    store: Arc<dyn KeyValueStore>,
    api_base_url: String,
    client: Client,
    active: RwLock<ActiveService>,
}

impl IdeaServiceSelector {
    /// Starts in local mode over `store`. `api_base_url` is where the remote
    /// variant finds the ideas API once a user signs in.
    pub fn new(store: Arc<dyn KeyValueStore>, api_base_url: impl Into<String>) -> Self {
        let active = ActiveService {
            mode: IdeaServiceMode::Local,
            service: Arc::new(LocalIdeaService::new(store.clone())),
        };
        Self {
            store,
            api_base_url: api_base_url.into(),
            client: Client::new(),
            active: RwLock::new(active),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn service(&self) -> Arc<dyn IdeaService> {
        self.read_active(|active| active.service.clone())
    }

    pub fn mode(&self) -> IdeaServiceMode {
        self.read_active(|active| active.mode)
    }

    /// The mode and service together, read under one lock.
    pub fn active(&self) -> (IdeaServiceMode, Arc<dyn IdeaService>) {
        self.read_active(|active| (active.mode, active.service.clone()))
    }

    pub fn set_local(&self) {
        info!("switching to local idea storage");
        self.install(
            IdeaServiceMode::Local,
            Arc::new(LocalIdeaService::new(self.store.clone())),
        );
    }

    /// Route to the signed-in user's account identified by `session_token`.
    pub fn set_remote(&self, session_token: impl Into<String>) {
        info!("switching to remote idea storage");
        let service = RemoteIdeaService::new(RemoteIdeaServiceOptions {
            base_url: self.api_base_url.clone(),
            session_token: session_token.into(),
            client: Some(self.client.clone()),
        });
        self.install(IdeaServiceMode::Remote, Arc::new(service));
    }

    fn install(&self, mode: IdeaServiceMode, service: Arc<dyn IdeaService>) {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = ActiveService { mode, service };
    }

    fn read_active<T>(&self, f: impl FnOnce(&ActiveService) -> T) -> T {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
        f(&active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn starts_local_and_switches_both_ways() {
        let selector = IdeaServiceSelector::new(Arc::new(MemoryStore::new()), "http://localhost");
        assert_eq!(selector.mode(), IdeaServiceMode::Local);
        assert_eq!(selector.service().name(), "local");

        selector.set_remote("token");
        assert_eq!(selector.mode(), IdeaServiceMode::Remote);
        assert_eq!(selector.service().name(), "remote");

        selector.set_local();
        let (mode, service) = selector.active();
        assert_eq!(mode, IdeaServiceMode::Local);
        assert_eq!(service.name(), "local");
    }

    #[test]
    fn query_keys_differ_per_mode() {
        assert_eq!(IdeaServiceMode::Local.query_key(), "local-ideas");
        assert_eq!(IdeaServiceMode::Remote.query_key(), "ideas");
    }
}
