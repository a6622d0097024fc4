use crate::{ChatMessage, ChatResult};
use futures::Stream;
use std::{
    pin::Pin,
    task::{Context, Poll},
};

/// Produces a streamed assistant reply for a transcript.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    fn provider(&self) -> &'static str;

    /// Open a completion stream for `messages` authenticated with `api_key`.
    /// Errors raised before the first fragment (including a rejected key)
    /// are returned here; later failures arrive as stream items.
    async fn stream(&self, messages: Vec<ChatMessage>, api_key: &str) -> ChatResult<TextStream>;
}

/// A finite, non-restartable sequence of reply fragments. The stream ends
/// after the last fragment, or yields an error and should not be polled
/// further.
pub struct TextStream(Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>);

impl TextStream {
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = ChatResult<String>> + Send + 'static,
    {
        Self(Box::pin(stream))
    }
}

impl Stream for TextStream {
    type Item = ChatResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.0.as_mut().poll_next(cx)
    }
}
