use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::citation::{Citation, ServerCitation};
use crate::state::TimelineEvent;
use crate::tool::{ToolCall, WebSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    UserQuery,
    BotResponse,
    Error,
}

impl MessageType {
    pub fn is_bot(&self) -> bool {
        matches!(self, MessageType::BotResponse | MessageType::Error)
    }
}

/// Transcript entry as displayed to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub web_sources: Vec<WebSource>,
    #[serde(default)]
    pub workflow_steps: Vec<TimelineEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
}

impl FormattedMessage {
    fn blank(message_type: MessageType, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message_type,
            content,
            created_at: now,
            updated_at: now,
            citations: Vec::new(),
            thinking: None,
            tool_calls: Vec::new(),
            web_sources: Vec::new(),
            workflow_steps: Vec::new(),
            confidence: None,
        }
    }

    /// Optimistic entry for a message the user just sent
    pub fn user(content: impl Into<String>) -> Self {
        Self::blank(MessageType::UserQuery, content.into())
    }

    /// Empty bot entry that streamed content fills in
    pub fn provisional_bot() -> Self {
        Self::blank(MessageType::BotResponse, String::new())
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::blank(MessageType::Error, content.into())
    }

    pub fn is_user(&self) -> bool {
        self.message_type == MessageType::UserQuery
    }

    pub fn is_bot(&self) -> bool {
        self.message_type.is_bot()
    }

    pub fn from_server(message: ServerMessage) -> Self {
        let now = Utc::now();
        let id = if message.id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            message.id
        };
        Self {
            id,
            message_type: message.message_type,
            content: message.content,
            created_at: message.created_at.unwrap_or(now),
            updated_at: message.updated_at.unwrap_or(now),
            citations: message
                .citations
                .into_iter()
                .filter_map(ServerCitation::into_citation)
                .collect(),
            thinking: message.reasoning.filter(|r| !r.is_empty()),
            tool_calls: message.tool_calls,
            web_sources: message.web_sources,
            workflow_steps: Vec::new(),
            confidence: message.confidence,
        }
    }
}

/// Message record as persisted by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default, alias = "_id")]
    pub id: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub citations: Vec<ServerCitation>,
    #[serde(default, alias = "thinking")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub web_sources: Vec<WebSource>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServerMessage {
    pub fn bot(content: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            message_type: MessageType::BotResponse,
            content: content.into(),
            citations: Vec::new(),
            reasoning: None,
            tool_calls: Vec::new(),
            web_sources: Vec::new(),
            confidence: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Server-persisted conversation as delivered with the completion event.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(default, alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<ServerMessage>,
}

impl Conversation {
    /// Last bot-authored message, which is the answer to the latest query
    pub fn final_bot_message(&self) -> Option<&ServerMessage> {
        self.messages.iter().rev().find(|m| m.message_type.is_bot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_final_bot_message_picks_last_bot() {
        let json = r#"{
            "_id": "conv-1",
            "title": "Greeting",
            "messages": [
                {"_id": "m1", "messageType": "user_query", "content": "hi"},
                {"_id": "m2", "messageType": "bot_response", "content": "hello"},
                {"_id": "m3", "messageType": "user_query", "content": "again"},
                {"_id": "m4", "messageType": "bot_response", "content": "hello again",
                 "citations": [{"citationId": "c1", "citationData": {"content": "x", "chunkIndex": 1}}]}
            ]
        }"#;
        let conversation: Conversation = serde_json::from_str(json).unwrap();
        let last = conversation.final_bot_message().unwrap();
        assert_eq!(last.id, "m4");

        let formatted = FormattedMessage::from_server(last.clone());
        assert_eq!(formatted.content, "hello again");
        assert_eq!(formatted.citations[0].id, "c1");
        assert!(formatted.is_bot());
    }

    #[test]
    fn test_from_server_fills_missing_id() {
        let formatted = FormattedMessage::from_server(ServerMessage::bot("text"));
        assert!(!formatted.id.is_empty());
        assert_eq!(formatted.thinking, None);
    }
}
