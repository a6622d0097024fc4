use crate::{AppState, AuthUser, ServerResult};
use aideas_sdk::{Idea, StoredIdea};
use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

pub async fn list_ideas_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> ServerResult<Json<Vec<StoredIdea>>> {
    let ideas = state.repository.list_ideas(&user.user_id).await?;
    Ok(Json(ideas))
}

pub async fn add_ideas_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Json(ideas): Json<Vec<Idea>>,
) -> ServerResult<(StatusCode, Json<Vec<StoredIdea>>)> {
    let stored = state.repository.insert_ideas(&user.user_id, ideas).await?;
    info!(user_id = %user.user_id, count = stored.len(), "saved ideas");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn reset_ideas_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> ServerResult<StatusCode> {
    let removed = state.repository.delete_ideas(&user.user_id).await?;
    info!(user_id = %user.user_id, removed, "reset ideas");
    Ok(StatusCode::OK)
}

pub async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Route not found")
}
