use crate::{Idea, IdeaResult, IdeaServiceMode, IdeaServiceSelector};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::watch;
use tracing::debug;

/// The idea list as the display layer should render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdeasView {
    pub mode: IdeaServiceMode,
    pub ideas: Vec<Idea>,
    pub loading: bool,
}

struct CacheEntry {
    ideas: Vec<Idea>,
    stale: bool,
}

#[derive(Default)]
struct QueryCache {
    entries: HashMap<IdeaServiceMode, CacheEntry>,
    /// Bumped by every invalidation and hydration. A load only lands fresh
    /// when nothing bumped it while the load was in flight.
    generation: u64,
}

/// Query and mutation bindings between the display layer and whichever idea
/// service is active.
///
/// Loaded lists are cached per persistence mode. Successful mutations mark
/// every cached list stale so the next read goes back to the service; failed
/// mutations leave the cache alone and hand the error to the caller.
/// A load that overlaps an invalidation is cached stale, so the next read
/// goes back to the service.
pub struct IdeaBindings {
    selector: Arc<IdeaServiceSelector>,
    cache: Mutex<QueryCache>,
    updates: watch::Sender<IdeasView>,
}

impl IdeaBindings {
    pub fn new(selector: Arc<IdeaServiceSelector>) -> Self {
        let (updates, _) = watch::channel(IdeasView {
            mode: selector.mode(),
            ideas: vec![],
            loading: false,
        });
        Self {
            selector,
            cache: Mutex::new(QueryCache::default()),
            updates,
        }
    }

    pub fn selector(&self) -> &Arc<IdeaServiceSelector> {
        &self.selector
    }

    pub fn subscribe(&self) -> watch::Receiver<IdeasView> {
        self.updates.subscribe()
    }

    /// Ideas for the active mode, from cache when fresh.
    pub async fn ideas(&self) -> Vec<Idea> {
        // Read the generation before the selector: a switch followed by an
        // invalidation then always shows up as a changed generation.
        let generation = self.lock().generation;
        let (mode, service) = self.selector.active();

        let (previous, fresh) = {
            let cache = self.lock();
            match cache.entries.get(&mode) {
                Some(entry) => (entry.ideas.clone(), !entry.stale),
                None => (vec![], false),
            }
        };

        if fresh {
            self.publish(mode, previous.clone(), false);
            return previous;
        }

        debug!(key = mode.query_key(), service = service.name(), "loading ideas");
        self.publish(mode, previous, true);

        let ideas = service.list_ideas().await;
        {
            let mut cache = self.lock();
            let stale = cache.generation != generation;
            if stale {
                debug!(key = mode.query_key(), "load overlapped an invalidation");
            }
            cache.entries.insert(
                mode,
                CacheEntry {
                    ideas: ideas.clone(),
                    stale,
                },
            );
        }
        self.publish(mode, ideas.clone(), false);
        ideas
    }

    /// What is cached for `mode`, fresh or stale.
    pub fn cached(&self, mode: IdeaServiceMode) -> Option<Vec<Idea>> {
        self.lock().entries.get(&mode).map(|entry| entry.ideas.clone())
    }

    /// Mark every cached list stale.
    pub fn invalidate(&self) {
        let mut cache = self.lock();
        cache.generation += 1;
        for entry in cache.entries.values_mut() {
            entry.stale = true;
        }
    }

    /// Seed the cache for `mode`, e.g. with ideas fetched while rendering the
    /// first page for a signed-in user.
    pub fn hydrate(&self, mode: IdeaServiceMode, ideas: Vec<Idea>) {
        {
            let mut cache = self.lock();
            cache.generation += 1;
            cache.entries.insert(
                mode,
                CacheEntry {
                    ideas: ideas.clone(),
                    stale: false,
                },
            );
        }
        self.publish(mode, ideas, false);
    }

    pub async fn add_raw_ideas(&self, raw: &str) -> IdeaResult<()> {
        self.selector.service().add_raw_ideas(raw).await?;
        self.invalidate();
        Ok(())
    }

    pub async fn reset_ideas(&self) -> IdeaResult<()> {
        self.selector.service().reset_ideas().await?;
        self.invalidate();
        Ok(())
    }

    fn publish(&self, mode: IdeaServiceMode, ideas: Vec<Idea>, loading: bool) {
        // A load that finishes after a mode switch only updates its cache
        // entry, not what is on screen.
        if self.selector.mode() != mode {
            return;
        }
        self.updates.send_replace(IdeasView {
            mode,
            ideas,
            loading,
        });
    }

    fn lock(&self) -> MutexGuard<'_, QueryCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
