use crate::{client_utils, ChatBackend, ChatError, ChatMessage, ChatResult, TextStream};
use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChatCompletionChunkChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChunkChoice {
    #[serde(default)]
    delta: ChatCompletionChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChatCompletionChunkDelta {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Clone, Default)]
pub struct OpenAIChatBackendOptions {
    pub base_url: Option<String>,
    pub client: Option<Client>,
}

/// Streams replies from an OpenAI-compatible `/chat/completions` endpoint.
/// The API key is supplied per request, so one backend serves whichever key
/// the user currently holds.
pub struct OpenAIChatBackend {
    model_id: String,
    base_url: String,
    client: Client,
}

impl OpenAIChatBackend {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: OpenAIChatBackendOptions) -> Self {
        let OpenAIChatBackendOptions { base_url, client } = options;

        let base_url = base_url
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            model_id: model_id.into(),
            base_url,
            client: client.unwrap_or_else(Client::new),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }
}

fn request_headers(api_key: &str) -> ChatResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let auth_header = HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|error| {
        ChatError::Invariant(PROVIDER, format!("Invalid API key header value: {error}"))
    })?;
    headers.insert(header::AUTHORIZATION, auth_header);
    Ok(headers)
}

#[async_trait::async_trait]
impl ChatBackend for OpenAIChatBackend {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    async fn stream(&self, messages: Vec<ChatMessage>, api_key: &str) -> ChatResult<TextStream> {
        debug!(model = %self.model_id, messages = messages.len(), "opening completion stream");

        let request = ChatCompletionRequest {
            model: self.model_id.clone(),
            messages,
            stream: true,
        };

        let mut chunks = client_utils::post_event_stream::<_, ChatCompletionChunk>(
            &self.client,
            &format!("{}/chat/completions", self.base_url),
            &request,
            request_headers(api_key)?,
            PROVIDER,
        )
        .await?;

        let stream = try_stream! {
            let mut refusal = String::new();

            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;

                if let Some(choice) = chunk.choices.into_iter().next() {
                    if let Some(delta_refusal) = choice.delta.refusal {
                        refusal.push_str(&delta_refusal);
                    }
                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            yield content;
                        }
                    }
                }
            }

            if !refusal.is_empty() {
                Err(ChatError::Invariant(PROVIDER, format!("Refusal: {refusal}")))?;
            }
        };

        Ok(TextStream::from_stream(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_the_full_transcript() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("hi")];
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages,
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    { "role": "system", "content": "rules" },
                    { "role": "user", "content": "hi" }
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn chunk_without_choices_decodes() {
        let chunk: ChatCompletionChunk =
            serde_json::from_str(r#"{"id":"x","usage":{"total_tokens":3}}"#).unwrap();
        assert!(chunk.choices.is_empty());
    }

    #[test]
    fn chunk_delta_content_decodes() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let backend = OpenAIChatBackend::new(
            "gpt-4o-mini",
            OpenAIChatBackendOptions {
                base_url: Some("http://localhost:1234/v1/".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(backend.base_url, "http://localhost:1234/v1");
        assert_eq!(backend.model_id(), "gpt-4o-mini");
    }
}
