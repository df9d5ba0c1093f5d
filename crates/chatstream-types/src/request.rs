use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Conversation mode; selects which streaming endpoint a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatMode {
    #[default]
    Chat,
    Knowledge,
    Agent,
    DeepResearch,
    Image,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Chat => "chat",
            ChatMode::Knowledge => "knowledge",
            ChatMode::Agent => "agent",
            ChatMode::DeepResearch => "deepResearch",
            ChatMode::Image => "image",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "chat" => Ok(ChatMode::Chat),
            "knowledge" => Ok(ChatMode::Knowledge),
            "agent" => Ok(ChatMode::Agent),
            "deepresearch" => Ok(ChatMode::DeepResearch),
            "image" => Ok(ChatMode::Image),
            other => Err(format!("unknown chat mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kb: Vec<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty() && self.kb.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub record_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl RequestContext {
    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty() && self.project_id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Body of a streaming chat request.
///
/// Empty optional parts are omitted from the JSON rather than sent as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSelection>,
    #[serde(default)]
    pub reasoning_enabled: bool,
    #[serde(default)]
    pub web_search_enabled: bool,
    #[serde(default, skip_serializing_if = "Filters::is_empty")]
    pub filters: Filters,
    #[serde(default, skip_serializing_if = "RequestContext::is_empty")]
    pub context: RequestContext,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_chat_mode(mut self, chat_mode: impl Into<String>) -> Self {
        self.chat_mode = Some(chat_mode.into());
        self
    }

    pub fn with_model(mut self, key: Option<String>, name: Option<String>) -> Self {
        self.model = if key.is_none() && name.is_none() {
            None
        } else {
            Some(ModelSelection { key, name })
        };
        self
    }

    pub fn with_reasoning(mut self, enabled: bool) -> Self {
        self.reasoning_enabled = enabled;
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search_enabled = enabled;
        self
    }

    pub fn with_filters(mut self, apps: Vec<String>, kb: Vec<String>) -> Self {
        self.filters = Filters { apps, kb };
        self
    }

    pub fn with_records(mut self, record_ids: Vec<String>) -> Self {
        self.context.record_ids = record_ids;
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.context.project_id = Some(project_id.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_minimal_request_omits_empty_fields() {
        let body = serde_json::to_value(ChatRequest::new("hello")).unwrap();
        assert_eq!(
            body,
            json!({
                "message": "hello",
                "reasoningEnabled": false,
                "webSearchEnabled": false
            })
        );
    }

    #[test]
    fn test_full_request_shape() {
        let request = ChatRequest::new("q")
            .with_conversation("conv-1")
            .with_model(Some("gpt".into()), None)
            .with_filters(vec![], vec!["kb-1".into()])
            .with_project("p-1")
            .with_web_search(true);

        let body = serde_json::to_value(request).unwrap();
        assert_eq!(body["conversationId"], "conv-1");
        assert_eq!(body["model"], json!({"key": "gpt"}));
        assert_eq!(body["filters"], json!({"kb": ["kb-1"]}));
        assert_eq!(body["context"], json!({"projectId": "p-1"}));
        assert_eq!(body["webSearchEnabled"], true);
        assert!(body.get("attachments").is_none());
    }

    #[test]
    fn test_chat_mode_parsing() {
        assert_eq!("deep-research".parse::<ChatMode>().unwrap(), ChatMode::DeepResearch);
        assert_eq!("deepResearch".parse::<ChatMode>().unwrap(), ChatMode::DeepResearch);
        assert!("voice".parse::<ChatMode>().is_err());
    }
}
