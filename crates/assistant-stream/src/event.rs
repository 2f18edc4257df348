use serde::Deserialize;

/// Parsed JSON payload of one `data:` record, discriminated by `object`.
///
/// Event kinds that carry nothing the transcript needs collapse into
/// [`StreamEvent::Other`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "object")]
pub enum StreamEvent {
    /// A thread was created for this run.
    #[serde(rename = "thread")]
    Thread { id: String },
    /// Incremental message content.
    #[serde(rename = "thread.message.delta")]
    MessageDelta {
        #[serde(default)]
        delta: Option<MessageDelta>,
    },
    /// Final message content.
    #[serde(rename = "thread.message.completed")]
    MessageCompleted {
        #[serde(default)]
        content: Option<Vec<ContentPart>>,
    },
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub content: Option<Vec<ContentPart>>,
}

/// One entry of a message `content` array.
///
/// Only text parts are read; image or file parts deserialize with `text: None`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<TextValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub value: Option<String>,
}

impl StreamEvent {
    /// Text carried by a delta or completed message.
    ///
    /// Returns `None` for other kinds and when no content part carries text.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::MessageDelta { delta } => delta
                .as_ref()
                .and_then(|delta| delta.content.as_deref())
                .and_then(join_text),
            Self::MessageCompleted { content } => content.as_deref().and_then(join_text),
            Self::Thread { .. } | Self::Other => None,
        }
    }

    /// The `object` tag this event was decoded from, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Thread { .. } => "thread",
            Self::MessageDelta { .. } => "thread.message.delta",
            Self::MessageCompleted { .. } => "thread.message.completed",
            Self::Other => "other",
        }
    }
}

fn join_text(parts: &[ContentPart]) -> Option<String> {
    let mut texts = parts
        .iter()
        .filter_map(|part| part.text.as_ref()?.value.as_deref())
        .peekable();
    texts.peek()?;
    Some(texts.collect())
}
