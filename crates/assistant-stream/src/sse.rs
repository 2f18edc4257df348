use crate::event::StreamEvent;

const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "DONE";

/// Classification of one decoded SSE line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseRecord<'a> {
    /// Not a `data:` line (blank line, comment, `event:`/`id:` field).
    Ignored,
    /// Termination sentinel (`data: [DONE]`).
    Done,
    /// Payload following the `data:` prefix.
    Payload(&'a str),
}

/// Classifies a single line of the stream.
///
/// Any payload that contains the `DONE` marker counts as the sentinel.
pub fn parse_line(line: &str) -> SseRecord<'_> {
    let Some(payload) = line.trim().strip_prefix(DATA_PREFIX) else {
        return SseRecord::Ignored;
    };
    if payload.contains(DONE_MARKER) {
        return SseRecord::Done;
    }
    SseRecord::Payload(payload.trim())
}

/// Decodes the JSON payload of a `data:` line.
pub fn parse_event(payload: &str) -> Result<StreamEvent, serde_json::Error> {
    serde_json::from_str(payload)
}
