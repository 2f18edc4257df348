//! Common imports for typical usage.
pub use crate::{
    AbortHandle, AssemblerState, AssistantClient, AssistantConfig, AssistantError,
    AssistantTransport, ConsumeOutcome, Conversation, StreamingReplyAssembler, Transcript,
};
