mod backend;

pub use backend::{MockChatBackend, MockStreamResult, MockStreamSender, TrackedStreamInput};
