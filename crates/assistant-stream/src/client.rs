use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AssistantConfig;
use crate::errors::AssistantError;
use crate::transport::{AssistantTransport, ByteStream, RunRequest};

const BETA_HEADER: &str = "OpenAI-Beta";

/// HTTP client for the Assistants API.
pub struct AssistantClient {
    client: reqwest::Client,
    config: AssistantConfig,
}

impl AssistantClient {
    /// Validates `config` and builds the underlying HTTP client.
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AssistantError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client from `OPENAI_*` environment variables.
    pub fn from_env() -> Result<Self, AssistantError> {
        Self::new(AssistantConfig::from_env()?)
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.config.api_key)
            .header(BETA_HEADER, &self.config.api_version)
    }
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> UserMessage<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Serialize)]
struct ThreadRunBody<'a> {
    assistant_id: &'a str,
    stream: bool,
    additional_messages: Vec<UserMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct NewThread<'a> {
    messages: Vec<UserMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct CreateThreadRunBody<'a> {
    assistant_id: &'a str,
    thread: NewThread<'a>,
    stream: bool,
}

/// URL and JSON body for a run request.
pub(crate) fn build_run_request(
    config: &AssistantConfig,
    request: &RunRequest,
) -> Result<(String, serde_json::Value), AssistantError> {
    let to_json = |body: Result<serde_json::Value, serde_json::Error>| {
        body.map_err(|e| AssistantError::Validation(format!("failed to serialize run body: {e}")))
    };
    match request {
        RunRequest::ExistingThread { thread_id, message } => {
            let body = ThreadRunBody {
                assistant_id: &config.assistant_id,
                stream: true,
                additional_messages: vec![UserMessage::new(message)],
            };
            Ok((config.runs_url(thread_id), to_json(serde_json::to_value(body))?))
        }
        RunRequest::NewThread { message } => {
            let body = CreateThreadRunBody {
                assistant_id: &config.assistant_id,
                thread: NewThread {
                    messages: vec![UserMessage::new(message)],
                },
                stream: true,
            };
            Ok((config.thread_runs_url(), to_json(serde_json::to_value(body))?))
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    #[serde(default)]
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

/// Text of the first content part of the newest message.
pub(crate) fn parse_latest_message(body: &str) -> Result<Option<String>, AssistantError> {
    let list: MessageList = serde_json::from_str(body)
        .map_err(|e| AssistantError::protocol(format!("invalid message list: {e}")))?;
    Ok(list
        .data
        .into_iter()
        .next()
        .and_then(|message| message.content.into_iter().next())
        .and_then(|content| content.text)
        .map(|text| text.value))
}

async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, AssistantError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    warn!(status = status.as_u16(), "assistant request rejected");
    Err(AssistantError::Status {
        status: status.as_u16(),
        message: body,
    })
}

#[async_trait::async_trait]
impl AssistantTransport for AssistantClient {
    async fn open_run(&self, request: &RunRequest) -> Result<ByteStream, AssistantError> {
        let (url, body) = build_run_request(&self.config, request)?;
        debug!(%url, thread_id = ?request.thread_id(), "opening streamed run");
        let response = self
            .request(reqwest::Method::POST, url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::transport(format!("run request failed: {e}")))?;
        let response = error_for_status(response).await?;
        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| AssistantError::transport(format!("stream read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<String>, AssistantError> {
        let url = self.config.messages_url(thread_id);
        debug!(%url, "fetching latest message");
        let response = self
            .request(reqwest::Method::GET, url)
            .send()
            .await
            .map_err(|e| AssistantError::transport(format!("messages request failed: {e}")))?;
        let response = error_for_status(response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| AssistantError::transport(format!("messages read failed: {e}")))?;
        parse_latest_message(&body)
    }
}
