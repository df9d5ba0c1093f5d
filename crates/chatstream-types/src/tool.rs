use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Running,
    Completed,
    Error,
}

impl ToolCallStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ToolCallStatus::Running)
    }
}

/// Tool invocation observed while an answer streams.
///
/// Created on the first `tool_call` event for an id and updated in place by
/// later events carrying the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Value,
    pub status: ToolCallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl ToolCall {
    pub fn running(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
            status: ToolCallStatus::Running,
            result: None,
        }
    }

    pub fn complete(&mut self, result: Value) {
        self.status = ToolCallStatus::Completed;
        self.result = Some(result);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ToolCallStatus::Error;
        self.result = Some(Value::String(error.into()));
    }
}

/// Web page consulted while answering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebSource {
    #[serde(alias = "link")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, alias = "description", skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl WebSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            snippet: None,
        }
    }
}
