// Client configuration: where the streaming endpoints live and how to reach them

use chatstream_types::{ChatMode, ChatRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};

const CONVERSATION_PLACEHOLDER: &str = "{conversationId}";
const AGENT_PLACEHOLDER: &str = "{agentId}";

/// Path pair for one chat mode: opening a conversation vs. continuing one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointTemplate {
    pub start: String,
    pub follow_up: String,
}

impl EndpointTemplate {
    pub fn new(start: impl Into<String>, follow_up: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            follow_up: follow_up.into(),
        }
    }
}

/// Streaming endpoint per [`ChatMode`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    pub chat: EndpointTemplate,
    pub knowledge: EndpointTemplate,
    pub agent: EndpointTemplate,
    pub deep_research: EndpointTemplate,
    pub image: EndpointTemplate,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            chat: EndpointTemplate::new(
                "conversations/stream",
                "conversations/{conversationId}/messages/stream",
            ),
            knowledge: EndpointTemplate::new(
                "conversations/knowledge/stream",
                "conversations/knowledge/{conversationId}/messages/stream",
            ),
            agent: EndpointTemplate::new(
                "agents/{agentId}/conversations/stream",
                "agents/{agentId}/conversations/{conversationId}/messages/stream",
            ),
            deep_research: EndpointTemplate::new(
                "conversations/deep-research/stream",
                "conversations/deep-research/{conversationId}/messages/stream",
            ),
            image: EndpointTemplate::new(
                "conversations/image/stream",
                "conversations/image/{conversationId}/messages/stream",
            ),
        }
    }
}

impl Endpoints {
    pub fn template(&self, mode: ChatMode) -> &EndpointTemplate {
        match mode {
            ChatMode::Chat => &self.chat,
            ChatMode::Knowledge => &self.knowledge,
            ChatMode::Agent => &self.agent,
            ChatMode::DeepResearch => &self.deep_research,
            ChatMode::Image => &self.image,
        }
    }

    /// Resolve the relative path for a request in the given mode
    pub fn path_for(&self, mode: ChatMode, request: &ChatRequest) -> Result<String> {
        let template = self.template(mode);
        let mut path = match request.conversation_id.as_deref() {
            Some(id) if !id.is_empty() => template.follow_up.replace(CONVERSATION_PLACEHOLDER, id),
            _ => template.start.clone(),
        };

        if path.contains(AGENT_PLACEHOLDER) {
            let agent_id = request
                .agent_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    ClientError::Config(format!("{} mode requires an agent id", mode))
                })?;
            path = path.replace(AGENT_PLACEHOLDER, agent_id);
        }

        Ok(path)
    }
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Bearer token (never serialized)
    #[serde(default, skip_serializing)]
    pub bearer_token: Option<String>,
    /// Limit for establishing the connection
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Longest silence tolerated between two reads of the event stream.
    /// There is no overall deadline, so long answers keep streaming.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    300_000
}

// Millisecond precision; anything shorter rounds up to 1ms rather than 0
fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: default_api_prefix(),
            bearer_token: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = duration_to_ms(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = duration_to_ms(timeout);
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    /// Absolute URL for a request in the given mode
    pub fn url_for(&self, mode: ChatMode, request: &ChatRequest) -> Result<String> {
        let path = self.endpoints.path_for(mode, request)?;
        Ok(join_url(&[&self.base_url, &self.api_prefix, &path]))
    }
}

fn join_url(parts: &[&str]) -> String {
    let mut url = String::new();
    for part in parts.iter().map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        if !url.is_empty() {
            url.push('/');
        }
        url.push_str(part);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_url() {
        let config = ClientConfig::new("http://localhost:3000/");
        let url = config.url_for(ChatMode::Chat, &ChatRequest::new("hi")).unwrap();
        assert_eq!(url, "http://localhost:3000/api/v1/conversations/stream");
    }

    #[test]
    fn test_follow_up_url() {
        let config = ClientConfig::new("http://localhost:3000").with_api_prefix("");
        let request = ChatRequest::new("hi").with_conversation("c42");
        let url = config.url_for(ChatMode::Knowledge, &request).unwrap();
        assert_eq!(
            url,
            "http://localhost:3000/conversations/knowledge/c42/messages/stream"
        );
    }

    #[test]
    fn test_agent_mode_requires_agent_id() {
        let config = ClientConfig::new("http://x");
        let err = config
            .url_for(ChatMode::Agent, &ChatRequest::new("hi"))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let request = ChatRequest::new("hi").with_agent("a1");
        let url = config.url_for(ChatMode::Agent, &request).unwrap();
        assert_eq!(url, "http://x/api/v1/agents/a1/conversations/stream");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://h","bearer_token":"secret"}"#).unwrap();
        assert_eq!(config.api_prefix, "/api/v1");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_timeout(), Duration::from_secs(300));
        assert_eq!(config.endpoints, Endpoints::default());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_sub_second_timeouts_keep_precision() {
        let config = ClientConfig::new("http://x")
            .with_connect_timeout(Duration::from_millis(250))
            .with_read_timeout(Duration::from_micros(10));
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        assert_eq!(config.read_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_zero_timeout_is_never_used() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://h","read_timeout_ms":0}"#).unwrap();
        assert_eq!(config.read_timeout(), Duration::from_millis(1));
    }
}
