use std::sync::Arc;

use futures::{Stream, StreamExt as _};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::decoder::LineDecoder;
use crate::errors::AssistantError;
use crate::event::StreamEvent;
use crate::format::format_inline;
use crate::sse::{SseRecord, parse_event, parse_line};
use crate::transcript::AssemblerState;

/// Handle used to stop an in-flight read loop.
#[derive(Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The read loop stops at its next suspension point and returns
    /// [`ConsumeOutcome::Aborted`].
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

/// How a read loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The `[DONE]` sentinel was received.
    Sentinel,
    /// The source ran out of bytes without a sentinel.
    EndOfStream,
    /// The caller aborted the stream.
    Aborted,
}

/// Effect of one line on the assembler state.
enum LineEffect {
    Unchanged,
    Updated,
    Sentinel,
}

/// Turns a streamed run body into a formatted transcript.
///
/// One assembler serves one stream at a time. The state lives in a `watch`
/// channel and is mutated in place; receivers from
/// [`StreamingReplyAssembler::subscribe`] are notified only when a chunk
/// actually changed it.
pub struct StreamingReplyAssembler {
    state: watch::Sender<AssemblerState>,
    lines: LineDecoder,
    terminated: bool,
    abort_tx: Arc<watch::Sender<bool>>,
}

impl Default for StreamingReplyAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingReplyAssembler {
    /// Creates an idle assembler with an empty transcript.
    pub fn new() -> Self {
        let (state, _) = watch::channel(AssemblerState::default());
        let (abort_tx, _) = watch::channel(false);
        Self {
            state,
            lines: LineDecoder::default(),
            terminated: false,
            abort_tx: Arc::new(abort_tx),
        }
    }

    /// Borrows the current state.
    ///
    /// The guard holds a read lock on the channel; drop it before feeding the
    /// assembler more input.
    pub fn state(&self) -> watch::Ref<'_, AssemblerState> {
        self.state.borrow()
    }

    /// Whether the sentinel has been seen on the current stream.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Receiver that observes a snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<AssemblerState> {
        self.state.subscribe()
    }

    /// Handle that aborts the current turn from another task.
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: self.abort_tx.clone(),
        }
    }

    /// Future that resolves once the current turn is aborted.
    pub(crate) fn aborted(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut abort_rx = self.abort_tx.subscribe();
        async move {
            if abort_rx.wait_for(|aborted| *aborted).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Resets everything for a new run and marks it as loading.
    ///
    /// `thread_id` seeds the state when the run targets an existing thread.
    pub fn begin_turn(&mut self, thread_id: Option<String>) {
        self.lines = LineDecoder::default();
        self.terminated = false;
        self.abort_tx.send_replace(false);
        self.state.send_replace(AssemblerState::new_turn(thread_id));
    }

    /// Clears the loading flag without touching the transcript.
    pub fn clear_loading(&mut self) {
        self.state
            .send_if_modified(|state| std::mem::replace(&mut state.is_loading, false));
    }

    /// Empties the transcript and clears loading, keeping the thread id.
    pub(crate) fn clear_transcript(&mut self) {
        self.state.send_if_modified(|state| {
            let changed = state.is_loading || !state.transcript.is_empty();
            state.is_loading = false;
            state.transcript = Default::default();
            changed
        });
    }

    /// Replaces the transcript with a single finalized message.
    pub(crate) fn show_complete(&mut self, message: String) {
        self.state.send_modify(|state| {
            state.transcript = Default::default();
            state.transcript.set_complete(message);
            state.is_loading = false;
        });
    }

    /// Drives the read loop until the sentinel, end of stream or abort.
    ///
    /// A transport error from the source clears the loading flag and is
    /// returned to the caller. Chunks are processed strictly in arrival order.
    pub async fn consume<S, B>(&mut self, stream: S) -> Result<ConsumeOutcome, AssistantError>
    where
        S: Stream<Item = Result<B, AssistantError>>,
        B: AsRef<[u8]>,
    {
        let mut stream = std::pin::pin!(stream);
        let mut abort_rx = self.abort_tx.subscribe();
        if *abort_rx.borrow_and_update() {
            self.clear_loading();
            return Ok(ConsumeOutcome::Aborted);
        }

        loop {
            tokio::select! {
                changed = abort_rx.changed() => {
                    if changed.is_ok() && *abort_rx.borrow_and_update() {
                        debug!("stream aborted by caller");
                        self.clear_loading();
                        return Ok(ConsumeOutcome::Aborted);
                    }
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(chunk)) => {
                            self.push_chunk(chunk.as_ref());
                            if self.terminated {
                                return Ok(ConsumeOutcome::Sentinel);
                            }
                        }
                        Some(Err(err)) => {
                            warn!(error = %err, "stream read failed");
                            self.clear_loading();
                            return Err(err);
                        }
                        None => {
                            self.finish();
                            return Ok(if self.terminated {
                                ConsumeOutcome::Sentinel
                            } else {
                                ConsumeOutcome::EndOfStream
                            });
                        }
                    }
                }
            }
        }
    }

    /// Processes one raw chunk. Lines after the sentinel are discarded.
    ///
    /// Subscribers are notified once per chunk, and only when a line in it
    /// changed the state.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        if self.terminated {
            return;
        }
        debug!(bytes = chunk.len(), "stream chunk");
        let lines = self.lines.push(chunk);
        if lines.is_empty() {
            return;
        }
        let mut terminated = false;
        self.state.send_if_modified(|state| {
            let mut changed = false;
            for line in &lines {
                match apply_line(state, line) {
                    LineEffect::Unchanged => {}
                    LineEffect::Updated => changed = true,
                    LineEffect::Sentinel => {
                        terminated = true;
                        return true;
                    }
                }
            }
            changed
        });
        self.terminated = terminated;
    }

    /// Handles the unterminated tail once the source is exhausted.
    pub fn finish(&mut self) {
        let tail = if self.terminated {
            None
        } else {
            self.lines.finish()
        };
        let mut terminated = self.terminated;
        self.state.send_modify(|state| {
            if let Some(tail) = tail
                && let LineEffect::Sentinel = apply_line(state, &tail)
            {
                terminated = true;
            }
            state.is_loading = false;
        });
        self.terminated = terminated;
    }
}

fn apply_line(state: &mut AssemblerState, line: &str) -> LineEffect {
    match parse_line(line) {
        SseRecord::Ignored => LineEffect::Unchanged,
        SseRecord::Done => {
            debug!("stream sentinel received");
            state.is_loading = false;
            LineEffect::Sentinel
        }
        SseRecord::Payload(payload) => match parse_event(payload) {
            Ok(event) => {
                if apply_event(state, event) {
                    LineEffect::Updated
                } else {
                    LineEffect::Unchanged
                }
            }
            Err(err) => {
                debug!(error = %err, "dropping malformed stream record");
                LineEffect::Unchanged
            }
        },
    }
}

/// Applies one event and reports whether the state changed.
fn apply_event(state: &mut AssemblerState, event: StreamEvent) -> bool {
    match event {
        StreamEvent::Thread { id } => {
            debug!(thread_id = %id, "thread announced");
            if state.thread_id.as_deref() == Some(id.as_str()) {
                return false;
            }
            state.thread_id = Some(id);
            true
        }
        StreamEvent::MessageDelta { .. } => match event.text() {
            Some(text) => {
                state.transcript.push_fragment(format_inline(&text));
                state.is_loading = false;
                true
            }
            None => false,
        },
        StreamEvent::MessageCompleted { .. } => match event.text() {
            Some(text) => {
                state.transcript.set_complete(format_inline(&text));
                true
            }
            None => false,
        },
        StreamEvent::Other => false,
    }
}
