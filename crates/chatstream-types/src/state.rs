use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::citation::CitationSet;
use crate::tool::{ToolCall, WebSource};

/// Live state of the answer currently streaming.
///
/// `content` is what has been revealed so far, not everything received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingState {
    pub message_id: Option<String>,
    pub content: String,
    pub citations: CitationSet,
    pub thinking: String,
    pub tool_calls: IndexMap<String, ToolCall>,
    pub web_sources: Vec<WebSource>,
    pub is_active: bool,
}

impl StreamingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to empty and inactive
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn tool_calls_vec(&self) -> Vec<ToolCall> {
        self.tool_calls.values().cloned().collect()
    }
}

/// Diagnostic entry for the status timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Value,
}

impl TimelineEvent {
    pub fn new(event: impl Into<String>, details: Value) -> Self {
        let step = details
            .get("step")
            .or_else(|| details.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let message = details
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event: event.into(),
            step,
            message,
            timestamp: Utc::now(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::Citation;
    use serde_json::json;

    #[test]
    fn test_reset_clears_everything() {
        let mut state = StreamingState::new();
        state.content.push_str("partial");
        state.citations.insert(Citation::new("c1", ""));
        state.thinking.push_str("hmm");
        state.is_active = true;

        state.reset();
        assert_eq!(state, StreamingState::default());
    }

    #[test]
    fn test_timeline_event_extracts_step_and_message() {
        let event = TimelineEvent::new(
            "status",
            json!({"status": "searching", "message": "Looking through your documents"}),
        );
        assert_eq!(event.step.as_deref(), Some("searching"));
        assert_eq!(event.message.as_deref(), Some("Looking through your documents"));
    }
}
