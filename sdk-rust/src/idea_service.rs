use crate::{Idea, IdeaResult};

/// Storage capability for saved ideas.
///
/// Implementations must behave identically from the caller's point of view:
/// reads are best effort and never fail, writes either apply completely or
/// report an error.
#[async_trait::async_trait]
pub trait IdeaService: Send + Sync {
    /// Identifies the implementation in logs.
    fn name(&self) -> &'static str;

    /// The full collection for the active owner, in insertion order.
    /// Any failure degrades to an empty collection.
    async fn list_ideas(&self) -> Vec<Idea>;

    /// Validate `raw` as a `{ "ideas": [...] }` payload and append it to the
    /// collection. Nothing is written when validation fails.
    async fn add_raw_ideas(&self, raw: &str) -> IdeaResult<()>;

    /// Empty the collection. Calling it on an empty collection is a no-op.
    async fn reset_ideas(&self) -> IdeaResult<()>;
}
