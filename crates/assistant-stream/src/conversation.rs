use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::assembler::{AbortHandle, ConsumeOutcome, StreamingReplyAssembler};
use crate::errors::AssistantError;
use crate::format::format_inline;
use crate::transcript::AssemblerState;
use crate::transport::{AssistantTransport, RunRequest};

/// One thread of turns with the assistant.
///
/// The first turn creates a thread; later turns append to it. Turns are
/// serialized by `&mut self`, so a new turn cannot start while one is being
/// consumed.
pub struct Conversation {
    transport: Arc<dyn AssistantTransport>,
    assembler: StreamingReplyAssembler,
    thread_id: Option<String>,
}

impl Conversation {
    /// Starts a conversation with no thread; the first turn creates one.
    pub fn new(transport: Arc<dyn AssistantTransport>) -> Self {
        Self {
            transport,
            assembler: StreamingReplyAssembler::new(),
            thread_id: None,
        }
    }

    /// Resumes an existing thread.
    pub fn with_thread(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Thread that the next turn is sent to, if one exists yet.
    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Borrows the state of the current turn.
    pub fn state(&self) -> watch::Ref<'_, AssemblerState> {
        self.assembler.state()
    }

    /// True while a reply is expected but no content has arrived yet.
    pub fn is_busy(&self) -> bool {
        self.assembler.state().is_loading
    }

    /// Receiver notified whenever the turn state changes.
    pub fn subscribe(&self) -> watch::Receiver<AssemblerState> {
        self.assembler.subscribe()
    }

    /// Handle that aborts the turn in flight, whether it is still waiting for
    /// the run to open or already streaming.
    pub fn abort_handle(&self) -> AbortHandle {
        self.assembler.abort_handle()
    }

    /// Sends one user message and streams the reply into the transcript.
    ///
    /// Prior transcript and loading state are reset first. A thread id
    /// announced by the stream is kept for the next turn.
    pub async fn send(&mut self, text: &str) -> Result<ConsumeOutcome, AssistantError> {
        let turn_id = uuid::Uuid::new_v4();
        let request = RunRequest::for_turn(self.thread_id.as_deref(), text);
        self.assembler.begin_turn(self.thread_id.clone());
        info!(%turn_id, thread_id = ?self.thread_id, "turn started");

        let aborted = self.assembler.aborted();
        let opened = tokio::select! {
            opened = self.transport.open_run(&request) => Some(opened),
            () = aborted => None,
        };
        let Some(opened) = opened else {
            info!(%turn_id, "turn aborted before the run opened");
            self.assembler.clear_loading();
            return Ok(ConsumeOutcome::Aborted);
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%turn_id, error = %err, "failed to open run");
                self.assembler.clear_loading();
                return Err(err);
            }
        };
        let result = self.assembler.consume(stream).await;

        let announced = self.assembler.state().thread_id.clone();
        if let Some(thread_id) = announced
            && self.thread_id.as_deref() != Some(thread_id.as_str())
        {
            info!(%turn_id, %thread_id, "thread adopted");
            self.thread_id = Some(thread_id);
        }
        if let Ok(outcome) = &result {
            info!(
                %turn_id,
                ?outcome,
                fragments = self.assembler.state().transcript.fragments().len(),
                "turn finished"
            );
        }
        result
    }

    /// Fetches the newest thread message without streaming and shows it as
    /// the finalized message.
    ///
    /// The transcript is cleared before the fetch, so a failed or empty fetch
    /// leaves nothing from the previous turn on display. Returns the formatted
    /// text, or `None` when the thread has no text yet.
    pub async fn refresh_latest_message(&mut self) -> Result<Option<String>, AssistantError> {
        let Some(thread_id) = self.thread_id.clone() else {
            return Err(AssistantError::Validation(
                "no thread to read messages from".into(),
            ));
        };
        self.assembler.clear_transcript();
        let Some(text) = self.transport.latest_message(&thread_id).await? else {
            return Ok(None);
        };
        let formatted = format_inline(&text);
        self.assembler.show_complete(formatted.clone());
        Ok(Some(formatted))
    }
}
