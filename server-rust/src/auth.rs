use crate::{AppState, ServerError};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tower_cookies::Cookies;

/// Cookie carrying the session token set by the identity provider.
pub const SESSION_COOKIE: &str = "session_token";

/// The signed-in user behind a request.
///
/// Resolved from an `Authorization: Bearer` header, or the session cookie
/// when the header is absent. Requests without a live session are rejected
/// with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match bearer_token(&parts.headers) {
            Some(token) => Some(token),
            None => Cookies::from_request_parts(parts, state)
                .await
                .ok()
                .and_then(|cookies| {
                    cookies
                        .get(SESSION_COOKIE)
                        .map(|cookie| cookie.value().to_string())
                }),
        };

        let Some(token) = token.filter(|token| !token.is_empty()) else {
            return Err(ServerError::Unauthorized);
        };

        match state.repository.session_user(&token).await? {
            Some(user_id) => Ok(Self { user_id }),
            None => Err(ServerError::Unauthorized),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_bearer_tokens() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }
}
