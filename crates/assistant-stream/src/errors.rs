/// Errors surfaced to callers of the assistant API.
///
/// Malformed records and events with an unexpected shape are absorbed by the
/// assembler and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid input to a request builder.
    #[error("validation error: {0}")]
    Validation(String),
    /// Connection failed while opening or reading a stream.
    #[error("transport error: {0}")]
    Transport(String),
    /// The initiating request returned a non-success HTTP status.
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    /// A non-streamed response body did not have the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl AssistantError {
    pub(crate) fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns the HTTP status code for status failures.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this failure happened on the wire rather than in local setup.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Status { .. })
    }
}
