use std::pin::Pin;

use crate::errors::AssistantError;

/// Prompt sent when the user submits blank input.
pub const DEFAULT_PROMPT: &str = "Hi";

/// Streamed response body of a run.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, AssistantError>> + Send + 'static>>;

/// A single user turn addressed to the assistant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunRequest {
    /// Adds the message to an existing thread and runs it.
    ExistingThread { thread_id: String, message: String },
    /// Creates a thread seeded with the message and runs it.
    NewThread { message: String },
}

impl RunRequest {
    /// Picks the request shape for a turn.
    ///
    /// Blank input is replaced with [`DEFAULT_PROMPT`].
    pub fn for_turn(thread_id: Option<&str>, text: &str) -> Self {
        let message = if text.trim().is_empty() {
            DEFAULT_PROMPT.to_string()
        } else {
            text.to_string()
        };
        match thread_id.filter(|id| !id.trim().is_empty()) {
            Some(thread_id) => Self::ExistingThread {
                thread_id: thread_id.to_string(),
                message,
            },
            None => Self::NewThread { message },
        }
    }

    /// User text carried by the request.
    pub fn message(&self) -> &str {
        match self {
            Self::ExistingThread { message, .. } | Self::NewThread { message } => message,
        }
    }

    /// Target thread, or `None` when the run creates one.
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            Self::ExistingThread { thread_id, .. } => Some(thread_id),
            Self::NewThread { .. } => None,
        }
    }
}

/// Network side of a conversation.
///
/// Implementations open the streamed run and hand back the raw body; they do
/// no parsing of the stream themselves.
#[async_trait::async_trait]
pub trait AssistantTransport: Send + Sync {
    /// Starts a streamed run. Non-success statuses must be returned as
    /// [`AssistantError::Status`] before any body is read.
    async fn open_run(&self, request: &RunRequest) -> Result<ByteStream, AssistantError>;

    /// Fetches the newest message of a thread without streaming.
    async fn latest_message(&self, thread_id: &str) -> Result<Option<String>, AssistantError>;
}
