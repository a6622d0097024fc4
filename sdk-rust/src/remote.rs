use crate::{idea::parse_ideas, Idea, IdeaError, IdeaResult, IdeaService, StoredIdea};
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client, Response, StatusCode,
};
use tracing::{debug, warn};

const NAME: &str = "remote";

#[derive(Clone, Default)]
pub struct RemoteIdeaServiceOptions {
    /// Origin of the ideas API, e.g. `http://localhost:4000`.
    pub base_url: String,
    /// Session token issued by the identity provider for the signed-in user.
    pub session_token: String,
    pub client: Option<Client>,
}

/// Keeps ideas in the signed-in user's account through the `/api/ideas`
/// endpoints.
///
/// Reads are best effort: any failure shows up as an empty list. Writes
/// surface every failure so callers never assume a mutation landed.
pub struct RemoteIdeaService {
    client: Client,
    ideas_url: String,
    session_token: String,
}

impl RemoteIdeaService {
    #[must_use]
    pub fn new(options: RemoteIdeaServiceOptions) -> Self {
        let RemoteIdeaServiceOptions {
            base_url,
            session_token,
            client,
        } = options;

        let base_url = base_url.trim_end_matches('/');

        Self {
            client: client.unwrap_or_else(Client::new),
            ideas_url: format!("{base_url}/api/ideas"),
            session_token,
        }
    }

    fn request_headers(&self) -> IdeaResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth_header = HeaderValue::from_str(&format!("Bearer {}", self.session_token))
            .map_err(|error| {
                IdeaError::Invariant(format!("Invalid session token header value: {error}"))
            })?;
        headers.insert(header::AUTHORIZATION, auth_header);
        Ok(headers)
    }

    async fn fetch_ideas(&self) -> IdeaResult<Vec<Idea>> {
        let response = self
            .client
            .get(&self.ideas_url)
            .headers(self.request_headers()?)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let ideas: Vec<StoredIdea> = response.json().await?;
        Ok(ideas.into_iter().map(Idea::from).collect())
    }
}

/// Map non-2xx responses to errors, 401 getting its own variant.
async fn ensure_success(response: Response) -> IdeaResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(IdeaError::Unauthorized);
    }
    Err(IdeaError::StatusCode(
        status,
        response.text().await.unwrap_or_default(),
    ))
}

#[async_trait::async_trait]
impl IdeaService for RemoteIdeaService {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn list_ideas(&self) -> Vec<Idea> {
        match self.fetch_ideas().await {
            Ok(ideas) => ideas,
            Err(e) => {
                warn!(error = %e, "failed to fetch remote ideas");
                vec![]
            }
        }
    }

    async fn add_raw_ideas(&self, raw: &str) -> IdeaResult<()> {
        let ideas = parse_ideas(raw).map_err(IdeaError::InvalidIdeas)?;
        debug!(count = ideas.len(), "saving ideas remotely");

        let response = self
            .client
            .post(&self.ideas_url)
            .headers(self.request_headers()?)
            .json(&ideas)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn reset_ideas(&self) -> IdeaResult<()> {
        debug!("resetting remote ideas");
        let response = self
            .client
            .delete(&self.ideas_url)
            .headers(self.request_headers()?)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
