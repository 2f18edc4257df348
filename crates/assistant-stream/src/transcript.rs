use serde::Serialize;

/// Formatted reply text accumulated during one turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    fragments: Vec<String>,
    complete: Option<String>,
}

impl Transcript {
    /// Appends a formatted delta. Fragments are never reordered or deduplicated.
    pub fn push_fragment(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    /// Records the finalized message. Earlier fragments are kept.
    pub fn set_complete(&mut self, message: String) {
        self.complete = Some(message);
    }

    /// Formatted deltas in arrival order.
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Finalized message, once one has been received.
    pub fn complete(&self) -> Option<&str> {
        self.complete.as_deref()
    }

    /// Concatenation of every streamed fragment.
    pub fn streamed_text(&self) -> String {
        self.fragments.concat()
    }

    /// Text to show: the finalized message when present, otherwise the
    /// streamed fragments.
    pub fn display(&self) -> String {
        match &self.complete {
            Some(message) => message.clone(),
            None => self.streamed_text(),
        }
    }

    /// True when nothing has been streamed or finalized yet.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() && self.complete.is_none()
    }
}

/// Observable state of the active turn.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AssemblerState {
    pub is_loading: bool,
    pub thread_id: Option<String>,
    pub transcript: Transcript,
}

impl AssemblerState {
    /// State at the start of a run: loading, empty transcript.
    pub fn new_turn(thread_id: Option<String>) -> Self {
        Self {
            is_loading: true,
            thread_id,
            transcript: Transcript::default(),
        }
    }
}
