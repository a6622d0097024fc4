mod auth;
mod config;
mod errors;
mod repository;
mod routes;

pub use auth::{AuthUser, SESSION_COOKIE};
pub use config::{ServerConfig, DEFAULT_APP_URL, DEFAULT_DATABASE_URL, DEFAULT_PORT};
pub use errors::*;
pub use repository::{IdeaRepository, CREATE_TABLES};

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<IdeaRepository>,
}

impl AppState {
    pub fn new(repository: IdeaRepository) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }
}

/// The ideas API. Every `/api/ideas` route requires a signed-in user;
/// anything else answers 404.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/ideas",
            get(routes::list_ideas_handler)
                .post(routes::add_ideas_handler)
                .delete(routes::reset_ideas_handler),
        )
        .fallback(routes::not_found_handler)
        .layer(CookieManagerLayer::new())
        .with_state(state)
}

/// CORS for the web app at `app_url`, with credentials so the session
/// cookie travels.
pub fn cors_layer(app_url: &str) -> ServerResult<CorsLayer> {
    let origin: HeaderValue = app_url
        .parse()
        .map_err(|_| ServerError::Config(format!("APP_URL is not a valid origin: {app_url}")))?;

    Ok(CorsLayer::new()
        .allow_origin([origin])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}
