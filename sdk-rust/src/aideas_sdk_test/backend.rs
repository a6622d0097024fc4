use std::{collections::VecDeque, sync::Mutex};

use futures::{channel::mpsc, stream};

use crate::{ChatBackend, ChatError, ChatMessage, ChatResult, TextStream};

/// Sender half of a mocked stream driven by the test, one item at a time.
/// Dropping it ends the stream successfully.
pub type MockStreamSender = mpsc::UnboundedSender<ChatResult<String>>;

/// Result for a mocked `stream` call.
pub enum MockStreamResult {
    /// Yield these items in order, then end. An `Err` item fails the stream
    /// mid-way.
    Items(Vec<ChatResult<String>>),
    /// Fail when opening the stream.
    Error(ChatError),
    /// Yield whatever the paired [`MockStreamSender`] sends.
    Channel(mpsc::UnboundedReceiver<ChatResult<String>>),
}

impl MockStreamResult {
    /// Construct a result that streams the fragments and completes.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Items(fragments.into_iter().map(|f| Ok(f.into())).collect())
    }

    /// Construct a result that streams the fragments and then fails.
    pub fn fragments_then_error<I, S>(fragments: I, error: ChatError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items: Vec<ChatResult<String>> =
            fragments.into_iter().map(|f| Ok(f.into())).collect();
        items.push(Err(error));
        Self::Items(items)
    }

    /// Construct a result that fails before any fragment.
    pub fn error(error: ChatError) -> Self {
        Self::Error(error)
    }
}

/// What a `stream` call received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedStreamInput {
    pub messages: Vec<ChatMessage>,
    pub api_key: String,
}

#[derive(Default)]
struct MockChatBackendState {
    mocked_stream_results: VecDeque<MockStreamResult>,
    tracked_stream_inputs: Vec<TrackedStreamInput>,
}

/// A chat backend for tests that records its inputs and replays enqueued
/// results.
#[derive(Default)]
pub struct MockChatBackend {
    state: Mutex<MockChatBackendState>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one mocked stream result.
    pub fn enqueue_stream(&self, result: MockStreamResult) -> &Self {
        let mut state = self.state.lock().expect("mock state poisoned");
        state.mocked_stream_results.push_back(result);
        drop(state);
        self
    }

    /// Enqueue a stream that stays open until the returned sender sends
    /// items or is dropped.
    pub fn enqueue_channel(&self) -> MockStreamSender {
        let (sender, receiver) = mpsc::unbounded();
        self.enqueue_stream(MockStreamResult::Channel(receiver));
        sender
    }

    /// Retrieve the tracked stream inputs accumulated so far.
    pub fn tracked_stream_inputs(&self) -> Vec<TrackedStreamInput> {
        let state = self.state.lock().expect("mock state poisoned");
        state.tracked_stream_inputs.clone()
    }
}

#[async_trait::async_trait]
impl ChatBackend for MockChatBackend {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn stream(&self, messages: Vec<ChatMessage>, api_key: &str) -> ChatResult<TextStream> {
        let mut state = self.state.lock().expect("mock state poisoned");

        let result = state.mocked_stream_results.pop_front().ok_or_else(|| {
            ChatError::Invariant("mock", "no mocked stream results available".into())
        })?;

        state.tracked_stream_inputs.push(TrackedStreamInput {
            messages,
            api_key: api_key.to_string(),
        });

        match result {
            MockStreamResult::Error(error) => Err(error),
            MockStreamResult::Items(items) => Ok(TextStream::from_stream(stream::iter(items))),
            MockStreamResult::Channel(receiver) => Ok(TextStream::from_stream(receiver)),
        }
    }
}
