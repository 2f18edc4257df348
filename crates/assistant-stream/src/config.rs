use std::time::Duration;

use crate::errors::AssistantError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_API_VERSION: &str = "assistants=v2";

/// Configuration for [`crate::AssistantClient`].
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Assistant that runs every turn.
    pub assistant_id: String,
    /// Base URL of the API, without the `/threads` suffix.
    ///
    /// Useful for proxies or local test servers.
    pub base_url: String,
    /// Value of the `OpenAI-Beta` header.
    pub api_version: String,
    /// HTTP timeout applied to the whole request, stream included.
    pub timeout: Duration,
}

impl AssistantConfig {
    /// Creates a config with the default base URL, API version and timeout.
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `OPENAI_API_KEY`, `OPENAI_ASSISTANT_ID` and the
    /// optional `OPENAI_BASE_URL`.
    pub fn from_env() -> Result<Self, AssistantError> {
        let api_key = required_env("OPENAI_API_KEY")?;
        let assistant_id = required_env("OPENAI_ASSISTANT_ID")?;
        let mut config = Self::new(api_key, assistant_id);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config = config.base_url(base_url);
        }
        Ok(config)
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the `OpenAI-Beta` header value.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), AssistantError> {
        if self.api_key.trim().is_empty() {
            return Err(AssistantError::Config("api_key must not be empty".into()));
        }
        if self.assistant_id.trim().is_empty() {
            return Err(AssistantError::Config(
                "assistant_id must not be empty".into(),
            ));
        }
        if self.base_url.trim().is_empty() {
            return Err(AssistantError::Config("base_url must not be empty".into()));
        }
        Ok(())
    }

    fn threads_url(&self) -> String {
        format!("{}/threads", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn thread_runs_url(&self) -> String {
        format!("{}/runs", self.threads_url())
    }

    pub(crate) fn runs_url(&self, thread_id: &str) -> String {
        format!("{}/{thread_id}/runs", self.threads_url())
    }

    pub(crate) fn messages_url(&self, thread_id: &str) -> String {
        format!("{}/{thread_id}/messages", self.threads_url())
    }
}

fn required_env(key: &str) -> Result<String, AssistantError> {
    let value = std::env::var(key).unwrap_or_default();
    if value.trim().is_empty() {
        return Err(AssistantError::Config(format!("missing {key}")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_under_threads() {
        let config = AssistantConfig::new("sk", "asst_1").base_url("http://localhost:8080/v1/");
        assert_eq!(config.thread_runs_url(), "http://localhost:8080/v1/threads/runs");
        assert_eq!(config.runs_url("t_1"), "http://localhost:8080/v1/threads/t_1/runs");
        assert_eq!(
            config.messages_url("t_1"),
            "http://localhost:8080/v1/threads/t_1/messages"
        );
    }

    #[test]
    fn defaults_target_assistants_v2() {
        let config = AssistantConfig::new("sk", "asst_1");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.api_version, "assistants=v2");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[test]
    fn validate_rejects_blank_credentials() {
        assert!(matches!(
            AssistantConfig::new(" ", "asst").validate(),
            Err(AssistantError::Config(msg)) if msg.contains("api_key")
        ));
        assert!(matches!(
            AssistantConfig::new("sk", "").validate(),
            Err(AssistantError::Config(msg)) if msg.contains("assistant_id")
        ));
        assert!(AssistantConfig::new("sk", "asst").validate().is_ok());
    }
}
