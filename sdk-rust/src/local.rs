use crate::{
    idea::parse_ideas, storage::KeyValueStore, Idea, IdeaEnvelope, IdeaError, IdeaResult,
    IdeaService,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const NAME: &str = "local";
pub const LOCAL_STORAGE_KEY: &str = "ideas";

/// Keeps ideas on this device inside a single key/value slot holding a
/// serialized [`IdeaEnvelope`].
///
/// `add_raw_ideas` is read-modify-write without locking, so two processes
/// writing the same store race and the last write wins.
pub struct LocalIdeaService {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl LocalIdeaService {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            key: LOCAL_STORAGE_KEY.to_string(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    fn write(&self, ideas: Vec<Idea>) -> IdeaResult<()> {
        let serialized = serde_json::to_string(&IdeaEnvelope { ideas })
            .map_err(|e| IdeaError::Invariant(format!("Failed to serialize ideas: {e}")))?;
        self.store.set(&self.key, &serialized)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl IdeaService for LocalIdeaService {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn list_ideas(&self) -> Vec<Idea> {
        let stored = match self.store.get(&self.key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return vec![],
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read local ideas");
                return vec![];
            }
        };

        match parse_ideas(&stored) {
            Ok(ideas) => ideas,
            Err(e) => {
                // Corrupt data is discarded so the parse error does not repeat.
                warn!(key = %self.key, error = %e, "discarding invalid local ideas");
                if let Err(e) = self.store.remove(&self.key) {
                    warn!(key = %self.key, error = %e, "failed to remove invalid local ideas");
                }
                vec![]
            }
        }
    }

    async fn add_raw_ideas(&self, raw: &str) -> IdeaResult<()> {
        // Read errors propagate; only an absent or invalid slot starts empty.
        let mut ideas = match self.store.get(&self.key)? {
            Some(stored) => parse_ideas(&stored).unwrap_or_else(|e| {
                warn!(key = %self.key, error = %e, "replacing invalid local ideas");
                vec![]
            }),
            None => vec![],
        };
        let new_ideas = parse_ideas(raw).map_err(IdeaError::InvalidIdeas)?;
        debug!(count = new_ideas.len(), "saving ideas locally");
        ideas.extend(new_ideas);
        self.write(ideas)
    }

    async fn reset_ideas(&self) -> IdeaResult<()> {
        debug!("resetting local ideas");
        self.write(vec![])
    }
}

/// True when `raw` holds a `{ "ideas": [...] }` envelope worth offering to
/// save, regardless of whether each entry validates.
pub fn looks_like_idea_envelope(raw: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(raw.trim()),
        Ok(Value::Object(map)) if map.get("ideas").is_some_and(Value::is_array)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn detects_idea_envelopes() {
        assert!(looks_like_idea_envelope(r#" {"ideas": []} "#));
        assert!(!looks_like_idea_envelope("1. Idea A"));
        assert!(!looks_like_idea_envelope(r#"{"ideas": "nope"}"#));
    }

    #[tokio::test]
    async fn custom_key_is_isolated_from_default_slot() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let service = LocalIdeaService::new(store.clone()).with_key("other");

        service
            .add_raw_ideas(r#"{"ideas":[{"idea":"a","context":"b"}]}"#)
            .await
            .unwrap();

        assert_eq!(store.get(LOCAL_STORAGE_KEY).unwrap(), None);
        assert!(store.get("other").unwrap().is_some());
    }
}
