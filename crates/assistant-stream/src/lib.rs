//! Streamed assistant replies: SSE decoding, event dispatch and transcript
//! assembly for the Assistants API.
//!
//! The [`StreamingReplyAssembler`] consumes any byte stream and never touches
//! the network. [`Conversation`] pairs it with an [`AssistantTransport`]
//! (normally [`AssistantClient`]) and keeps the thread across turns.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use assistant_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), AssistantError> {
//! let client = AssistantClient::new(AssistantConfig::from_env()?)?;
//! let mut conversation = Conversation::new(Arc::new(client));
//!
//! conversation.send("Say hello").await?;
//! println!("{}", conversation.state().transcript.display());
//! # Ok(())
//! # }
//! ```

/// Read loop, abort handle and event dispatch.
pub mod assembler;
/// reqwest-backed transport.
pub mod client;
/// Client configuration.
pub mod config;
/// Thread-aware turn driver.
pub mod conversation;
/// Incremental UTF-8 and line decoding.
pub mod decoder;
/// Public error type.
pub mod errors;
/// Typed stream events.
pub mod event;
/// Inline markup applied to reply text.
pub mod format;
/// Process-wide logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// SSE line classification.
pub mod sse;
/// Transcript and assembler state.
pub mod transcript;
/// Transport contract and run requests.
pub mod transport;

pub use assembler::{AbortHandle, ConsumeOutcome, StreamingReplyAssembler};
pub use client::AssistantClient;
pub use config::AssistantConfig;
pub use conversation::Conversation;
pub use errors::AssistantError;
pub use event::StreamEvent;
pub use format::format_inline;
pub use observability::init_observability;
pub use transcript::{AssemblerState, Transcript};
pub use transport::{AssistantTransport, ByteStream, DEFAULT_PROMPT, RunRequest};
