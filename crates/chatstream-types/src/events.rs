use serde::Serialize;
use serde_json::Value;

use crate::citation::Citation;
use crate::message::{Conversation, ServerMessage};
use crate::tool::WebSource;

/// Raw `(event, data)` pair as it came off the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub event: String,
    pub data: Value,
}

impl RawEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Canonical chat stream event.
///
/// Every wire event name maps to exactly one variant; names nothing handles
/// land in `Ignored`.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Status {
        status: String,
        message: Option<String>,
    },

    /// Answer text fragment plus any citations delivered with it
    AnswerChunk {
        chunk: String,
        citations: Vec<Citation>,
    },

    ThinkingChunk {
        chunk: String,
    },

    ToolCall {
        id: Option<String>,
        name: Option<String>,
        args: Value,
    },

    ToolResult {
        id: Option<String>,
        result: Value,
    },

    ToolError {
        id: Option<String>,
        error: String,
    },

    WebSources {
        sources: Vec<WebSource>,
    },

    /// Retrieval/search progress shown on the timeline only
    Progress {
        name: String,
        details: Value,
    },

    Meta {
        conversation_id: Option<String>,
        message_id: Option<String>,
        details: Value,
    },

    TitleGenerated {
        title: String,
    },

    MemorySuggestion {
        suggestion: Value,
    },

    Complete(Completion),

    Error {
        message: String,
    },

    Ignored {
        name: String,
    },
}

impl ChatEvent {
    pub fn name(&self) -> &str {
        match self {
            ChatEvent::Status { .. } => "status",
            ChatEvent::AnswerChunk { .. } => "answer_chunk",
            ChatEvent::ThinkingChunk { .. } => "thinking_chunk",
            ChatEvent::ToolCall { .. } => "tool_call",
            ChatEvent::ToolResult { .. } => "tool_result",
            ChatEvent::ToolError { .. } => "tool_error",
            ChatEvent::WebSources { .. } => "web_sources",
            ChatEvent::Progress { name, .. } => name,
            ChatEvent::Meta { .. } => "meta",
            ChatEvent::TitleGenerated { .. } => "title_generated",
            ChatEvent::MemorySuggestion { .. } => "memory_suggestion",
            ChatEvent::Complete(_) => "complete",
            ChatEvent::Error { .. } => "error",
            ChatEvent::Ignored { name } => name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Complete(_) | ChatEvent::Error { .. })
    }
}

/// Authoritative final state delivered once at the end of a stream.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub conversation: Option<Conversation>,
    pub message: Option<ServerMessage>,
}

impl Completion {
    pub fn from_conversation(conversation: Conversation) -> Self {
        Self {
            conversation: Some(conversation),
            message: None,
        }
    }

    pub fn from_message(message: ServerMessage) -> Self {
        Self {
            conversation: None,
            message: Some(message),
        }
    }

    /// Final bot message: the conversation's last bot entry, else the bare message
    pub fn final_message(&self) -> Option<&ServerMessage> {
        self.conversation
            .as_ref()
            .and_then(Conversation::final_bot_message)
            .or(self.message.as_ref())
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation
            .as_ref()
            .map(|c| c.id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.conversation.as_ref().and_then(|c| c.title.as_deref())
    }
}

// Completions are compared by the final message they resolve to.
impl PartialEq for Completion {
    fn eq(&self, other: &Self) -> bool {
        let left = self.final_message().map(|m| (&m.id, &m.content));
        let right = other.final_message().map(|m| (&m.id, &m.content));
        left == right && self.conversation_id() == other.conversation_id()
    }
}
