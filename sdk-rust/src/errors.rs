use thiserror::Error;

/// A batch of ideas failed validation.
/// Carries every field-level message collected while checking the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .messages.join(", "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

impl ValidationError {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

#[derive(Error, Debug)]
pub enum IdeaError {
    /// The raw payload handed to `add_raw_ideas` did not validate.
    #[error("Invalid ideas: {0}")]
    InvalidIdeas(ValidationError),
    /// The request to the ideas API failed or its response could not be
    /// parsed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The ideas API rejected the session (401).
    #[error("Unauthorized: sign in to use the remote idea store")]
    Unauthorized,
    /// The ideas API returned a non-success status code.
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// Reading or writing the local key/value store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("Invariant: {0}")]
    Invariant(String),
}

pub type IdeaResult<T> = Result<T, IdeaError>;

#[derive(Error, Debug)]
pub enum ChatError {
    /// A prompt was sent before an API key was set.
    #[error("An API key is required before chatting")]
    CredentialMissing,
    /// A prompt was sent while the previous reply was still streaming.
    #[error("A reply is already streaming")]
    AlreadyStreaming,
    /// The request to the completion backend failed or the stream broke.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The completion backend returned a non-OK status code. An invalid API
    /// key surfaces here as a 401.
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The completion backend produced something we could not interpret.
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
}

pub type ChatResult<T> = Result<T, ChatError>;
