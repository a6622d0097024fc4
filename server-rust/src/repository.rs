//! SQLite storage for saved ideas and the sessions that identify their
//! owners.

use crate::ServerResult;
use aideas_sdk::{Idea, StoredIdea};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Statements creating the schema. Each is idempotent.
pub const CREATE_TABLES: &[&str] = &[
    // Owner-scoped ideas; rowid keeps insertion order
    "CREATE TABLE IF NOT EXISTS saved_ideas (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        idea TEXT NOT NULL,
        context TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_saved_ideas_user ON saved_ideas(user_id)",
    // Sessions issued by the identity provider; expires is unix seconds
    "CREATE TABLE IF NOT EXISTS sessions (
        session_token TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL,
        expires BIGINT NOT NULL
    )",
];

#[derive(Clone)]
pub struct IdeaRepository {
    pool: SqlitePool,
}

impl IdeaRepository {
    /// Connect to `url` and create the schema if needed.
    pub async fn connect(url: &str) -> ServerResult<Self> {
        let is_in_memory = url.contains("mode=memory");

        // An in-memory database disappears with its last connection
        let pool = if is_in_memory {
            SqlitePoolOptions::new()
                .max_connections(5)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?
        };

        if !is_in_memory {
            sqlx::query("PRAGMA journal_mode = WAL;")
                .execute(&pool)
                .await?;
        }
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await?;

        let repository = Self { pool };
        repository.initialize().await?;
        Ok(repository)
    }

    /// A private in-memory database, used by tests and local tryouts.
    pub async fn in_memory() -> ServerResult<Self> {
        let url = format!("sqlite:file:mem_{}?mode=memory&cache=shared", Uuid::new_v4().simple());
        Self::connect(&url).await
    }

    async fn initialize(&self) -> ServerResult<()> {
        for statement in CREATE_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// All ideas owned by `user_id`, oldest first.
    pub async fn list_ideas(&self, user_id: &str) -> ServerResult<Vec<StoredIdea>> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT id, idea, context FROM saved_ideas WHERE user_id = ? ORDER BY rowid",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, idea, context)| StoredIdea { id, idea, context })
            .collect())
    }

    /// Insert the batch for `user_id` in one transaction, assigning fresh ids.
    pub async fn insert_ideas(
        &self,
        user_id: &str,
        ideas: Vec<Idea>,
    ) -> ServerResult<Vec<StoredIdea>> {
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(ideas.len());

        for Idea { idea, context } in ideas {
            let id = Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO saved_ideas (id, user_id, idea, context) VALUES (?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(user_id)
            .bind(&idea)
            .bind(&context)
            .execute(&mut *tx)
            .await?;
            stored.push(StoredIdea { id, idea, context });
        }

        tx.commit().await?;
        debug!(user_id, count = stored.len(), "inserted ideas");
        Ok(stored)
    }

    /// Delete every idea owned by `user_id`. Returns how many went.
    pub async fn delete_ideas(&self, user_id: &str) -> ServerResult<u64> {
        let result = sqlx::query("DELETE FROM saved_ideas WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Record a session for `user_id`, replacing any previous one with the
    /// same token.
    pub async fn create_session(
        &self,
        session_token: &str,
        user_id: &str,
        expires: DateTime<Utc>,
    ) -> ServerResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO sessions (session_token, user_id, expires) VALUES (?, ?, ?)",
        )
        .bind(session_token)
        .bind(user_id)
        .bind(expires.timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The user behind an unexpired session token.
    pub async fn session_user(&self, session_token: &str) -> ServerResult<Option<String>> {
        let user: Option<(String,)> = sqlx::query_as(
            "SELECT user_id FROM sessions WHERE session_token = ? AND expires > ?",
        )
        .bind(session_token)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user.map(|(user_id,)| user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn ideas_are_scoped_to_their_owner() {
        let repository = IdeaRepository::in_memory().await.unwrap();
        repository
            .insert_ideas("alice", vec![Idea::new("A", "a"), Idea::new("B", "b")])
            .await
            .unwrap();
        repository
            .insert_ideas("bob", vec![Idea::new("C", "c")])
            .await
            .unwrap();

        let alice: Vec<String> = repository
            .list_ideas("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|stored| stored.idea)
            .collect();
        assert_eq!(alice, vec!["A", "B"]);

        assert_eq!(repository.delete_ideas("alice").await.unwrap(), 2);
        assert!(repository.list_ideas("alice").await.unwrap().is_empty());
        assert_eq!(repository.list_ideas("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn inserted_ideas_get_distinct_ids() {
        let repository = IdeaRepository::in_memory().await.unwrap();
        let stored = repository
            .insert_ideas("alice", vec![Idea::new("A", "a"), Idea::new("A", "a")])
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
    }

    #[tokio::test]
    async fn expired_sessions_resolve_to_nobody() {
        let repository = IdeaRepository::in_memory().await.unwrap();
        repository
            .create_session("live", "alice", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        repository
            .create_session("stale", "alice", Utc::now() - Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(
            repository.session_user("live").await.unwrap().as_deref(),
            Some("alice")
        );
        assert_eq!(repository.session_user("stale").await.unwrap(), None);
        assert_eq!(repository.session_user("missing").await.unwrap(), None);
    }
}
