use crate::{ChatError, ChatResult};
use eventsource_stream::{EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use reqwest::{header::HeaderMap, Client};
use serde::{de::DeserializeOwned, Serialize};
use std::pin::Pin;

pub type ChunkStream<R> = Pin<Box<dyn Stream<Item = ChatResult<R>> + Send>>;

/// POST `body` as JSON and decode the server-sent events of the response
/// into `R` chunks, ending at the `[DONE]` sentinel.
///
/// A non-2xx response fails before any chunk with its status and body.
pub async fn post_event_stream<T, R>(
    client: &Client,
    url: &str,
    body: &T,
    headers: HeaderMap,
    provider: &'static str,
) -> ChatResult<ChunkStream<R>>
where
    T: Serialize + 'static,
    R: DeserializeOwned + Send + 'static,
{
    let response = client.post(url).headers(headers).json(body).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ChatError::StatusCode(
            status,
            response.text().await.unwrap_or_default(),
        ));
    }

    let mut events = response.bytes_stream().eventsource();

    let stream = async_stream::try_stream! {
        while let Some(event) = events.next().await {
            let event = event.map_err(|error| match error {
                EventStreamError::Transport(error) => ChatError::Transport(error),
                EventStreamError::Utf8(_) => ChatError::Invariant(
                    provider,
                    "Received invalid UTF-8 in event stream".to_string(),
                ),
                EventStreamError::Parser(error) => ChatError::Invariant(
                    provider,
                    format!("Received malformed event stream: {error}"),
                ),
            })?;

            match event.data.as_str() {
                "" => continue,
                "[DONE]" => break,
                data => {
                    let chunk: R = serde_json::from_str(data).map_err(|error| {
                        ChatError::Invariant(provider, format!("Failed to parse stream chunk: {error}"))
                    })?;
                    yield chunk;
                }
            }
        }
    };

    Ok(Box::pin(stream))
}
