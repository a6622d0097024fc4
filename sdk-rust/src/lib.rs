mod bindings;
mod chat;
mod chat_backend;
mod client_utils;
mod context;
mod credentials;
mod errors;
mod idea;
mod idea_service;
mod local;
pub mod openai;
mod remote;
mod selector;
mod storage;
mod types;

pub mod aideas_sdk_test;

pub use bindings::{IdeaBindings, IdeasView};
pub use chat::{validate_prompt_input, ChatSession, GREETING, SYSTEM_PROMPT};
pub use chat_backend::{ChatBackend, TextStream};
pub use context::{AppContext, AppContextOptions};
pub use credentials::{validate_api_key_input, CredentialHolder};
pub use errors::*;
pub use idea::{parse_ideas, Idea, IdeaEnvelope, StoredIdea};
pub use idea_service::IdeaService;
pub use local::{looks_like_idea_envelope, LocalIdeaService, LOCAL_STORAGE_KEY};
pub use remote::{RemoteIdeaService, RemoteIdeaServiceOptions};
pub use selector::{IdeaServiceMode, IdeaServiceSelector};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::*;
