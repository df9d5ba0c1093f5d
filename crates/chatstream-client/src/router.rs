//! Maps wire events onto the canonical [`ChatEvent`] vocabulary.
//!
//! Payload shapes differ per event name and across server versions, so
//! fields are looked up under every name they have been sent as. The
//! mapping is total: anything unrecognised becomes `ChatEvent::Ignored`.

use chatstream_types::{
    ChatEvent, Citation, Completion, Conversation, RawEvent, ServerCitation, ServerMessage,
    TimelineEvent, WebSource,
};
use serde_json::Value;

/// Wire event names that are recorded on the status timeline
pub const TIMELINE_EVENTS: &[&str] = &[
    "status",
    "rag_search",
    "rag_results",
    "web_search",
    "web_results",
    "web_sources",
    "tool_call",
    "tool_success",
    "tool_error",
    "thinking_chunk",
    "thinking_complete",
    "meta",
    "error",
];

const FALLBACK_ERROR_MESSAGE: &str = "Something went wrong while generating the answer";

/// A canonical event plus its timeline entry, when the wire name is logged
#[derive(Debug, Clone)]
pub struct RoutedEvent {
    pub event: ChatEvent,
    pub timeline: Option<TimelineEvent>,
}

pub fn is_timeline_event(name: &str) -> bool {
    TIMELINE_EVENTS.contains(&name)
}

/// Normalize and dispatch one decoded event
pub fn route(raw: RawEvent) -> RoutedEvent {
    let timeline = is_timeline_event(&raw.event)
        .then(|| TimelineEvent::new(raw.event.clone(), raw.data.clone()));

    let event = canonicalize(&raw.event, raw.data);
    if let ChatEvent::Ignored { name } = &event {
        tracing::debug!(event = %name, "No handler for stream event");
    }

    RoutedEvent { event, timeline }
}

/// Pure mapping from `(name, payload)` to a canonical event
pub fn canonicalize(name: &str, data: Value) -> ChatEvent {
    match name {
        "status" => ChatEvent::Status {
            status: first_str(&data, &["status", "step"]).unwrap_or_default(),
            message: first_str(&data, &["message"]),
        },

        "answer_chunk" | "token" => match first_str(&data, &["chunk", "token", "content"]) {
            Some(chunk) => ChatEvent::AnswerChunk {
                chunk,
                citations: citations_of(&data),
            },
            None => ignored(name),
        },

        "thinking_chunk" | "reasoning_chunk" => {
            match first_str(&data, &["chunk", "content", "thinking"]) {
                Some(chunk) => ChatEvent::ThinkingChunk { chunk },
                None => ignored(name),
            }
        }

        "thinking_complete" | "rag_search" | "rag_results" | "web_search" => ChatEvent::Progress {
            name: name.to_string(),
            details: data,
        },

        "tool" | "tool_call" => ChatEvent::ToolCall {
            id: tool_call_id(&data),
            name: first_str(&data, &["name", "toolName", "tool"]),
            args: tool_args(&data),
        },

        "tool_result" | "tool_success" => ChatEvent::ToolResult {
            id: tool_call_id(&data),
            result: first_value(&data, &["result", "output", "content"]).unwrap_or(data),
        },

        "tool_error" => ChatEvent::ToolError {
            id: tool_call_id(&data),
            error: first_str(&data, &["error", "message"])
                .unwrap_or_else(|| "Tool execution failed".to_string()),
        },

        "web_sources" | "web_results" => ChatEvent::WebSources {
            sources: web_sources_of(&data),
        },

        "meta" => ChatEvent::Meta {
            conversation_id: first_str(&data, &["conversationId", "conversation_id"]),
            message_id: first_str(&data, &["messageId", "message_id"]),
            details: data,
        },

        "title_generated" => match first_str(&data, &["title", "conversationTitle"]) {
            Some(title) => ChatEvent::TitleGenerated { title },
            None => ignored(name),
        },

        "memory_suggestion" => ChatEvent::MemorySuggestion { suggestion: data },

        "complete" | "end" => ChatEvent::Complete(completion_of(&data).unwrap_or_default()),

        "message" => match completion_of(&data) {
            Some(completion) => ChatEvent::Complete(completion),
            None => ignored(name),
        },

        "error" => ChatEvent::Error {
            message: error_message(&data),
        },

        _ => ignored(name),
    }
}

fn ignored(name: &str) -> ChatEvent {
    ChatEvent::Ignored {
        name: name.to_string(),
    }
}

fn first_value(data: &Value, keys: &[&str]) -> Option<Value> {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .find(|value| !value.is_null())
        .cloned()
}

fn first_str(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .find_map(|value| value.as_str())
        .map(str::to_string)
}

fn tool_call_id(data: &Value) -> Option<String> {
    first_str(data, &["id", "toolCallId", "tool_call_id", "callId"]).filter(|id| !id.is_empty())
}

fn tool_args(data: &Value) -> Value {
    match first_value(data, &["args", "arguments", "input"]) {
        // Some servers send the arguments JSON-encoded
        Some(Value::String(raw)) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
        Some(value) => value,
        None => Value::Null,
    }
}

fn citations_of(data: &Value) -> Vec<Citation> {
    data.get("citations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<ServerCitation>(item.clone()).ok())
                .filter_map(ServerCitation::into_citation)
                .collect()
        })
        .unwrap_or_default()
}

fn web_sources_of(data: &Value) -> Vec<WebSource> {
    let items = match data {
        Value::Array(items) => Some(items),
        _ => ["sources", "results", "webSources"]
            .iter()
            .find_map(|key| data.get(*key).and_then(Value::as_array)),
    };

    items
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<WebSource>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

fn completion_of(data: &Value) -> Option<Completion> {
    if let Some(conversation) = data
        .get("conversation")
        .and_then(|c| serde_json::from_value::<Conversation>(c.clone()).ok())
    {
        return Some(Completion::from_conversation(conversation));
    }

    if let Some(message) = data
        .get("message")
        .filter(|m| m.is_object())
        .and_then(|m| serde_json::from_value::<ServerMessage>(m.clone()).ok())
    {
        return Some(Completion::from_message(message));
    }

    let content = first_str(data, &["content", "answer"])?;
    let mut message = ServerMessage::bot(content);
    message.citations = data
        .get("citations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<ServerCitation>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();
    if let Some(id) = first_str(data, &["messageId", "_id"]) {
        message.id = id;
    }
    Some(Completion::from_message(message))
}

fn error_message(data: &Value) -> String {
    match data {
        Value::String(message) if !message.is_empty() => message.clone(),
        _ => first_str(data, &["message", "error", "detail"])
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_aliases_answer_chunk() {
        let event = canonicalize("token", json!({"token": "Hel"}));
        assert_eq!(
            event,
            ChatEvent::AnswerChunk {
                chunk: "Hel".to_string(),
                citations: vec![],
            }
        );
    }

    #[test]
    fn test_answer_chunk_with_citations() {
        let event = canonicalize(
            "answer_chunk",
            json!({"chunk": "text [1]", "citations": [{"_id": "c1", "content": "x", "chunkIndex": 1}, {"bad": true}]}),
        );
        match event {
            ChatEvent::AnswerChunk { chunk, citations } => {
                assert_eq!(chunk, "text [1]");
                assert_eq!(citations.len(), 1);
                assert_eq!(citations[0].id, "c1");
            }
            other => panic!("Expected AnswerChunk, got {:?}", other),
        }
    }

    #[test]
    fn test_end_is_complete() {
        match canonicalize("end", json!({})) {
            ChatEvent::Complete(completion) => assert!(completion.final_message().is_none()),
            other => panic!("Expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_message_with_content_is_complete() {
        match canonicalize("message", json!({"content": "Full answer", "messageId": "m1"})) {
            ChatEvent::Complete(completion) => {
                let message = completion.final_message().unwrap();
                assert_eq!(message.content, "Full answer");
                assert_eq!(message.id, "m1");
            }
            other => panic!("Expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_message_without_content_is_ignored() {
        assert_eq!(
            canonicalize("message", json!({"x": 1})),
            ChatEvent::Ignored { name: "message".to_string() }
        );
    }

    #[test]
    fn test_complete_with_conversation() {
        let data = json!({
            "conversation": {
                "_id": "conv-1",
                "messages": [
                    {"_id": "u1", "messageType": "user_query", "content": "q"},
                    {"_id": "b1", "messageType": "bot_response", "content": "answer"}
                ]
            }
        });
        match canonicalize("complete", data) {
            ChatEvent::Complete(completion) => {
                assert_eq!(completion.conversation_id(), Some("conv-1"));
                assert_eq!(completion.final_message().unwrap().id, "b1");
            }
            other => panic!("Expected Complete, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_events() {
        assert_eq!(
            canonicalize("tool", json!({"id": "t1", "name": "search", "args": "{\"q\":\"x\"}"})),
            ChatEvent::ToolCall {
                id: Some("t1".into()),
                name: Some("search".into()),
                args: json!({"q": "x"}),
            }
        );
        assert_eq!(
            canonicalize("tool_success", json!({"toolCallId": "t1", "output": [1, 2]})),
            ChatEvent::ToolResult {
                id: Some("t1".into()),
                result: json!([1, 2]),
            }
        );
        assert_eq!(
            canonicalize("tool_error", json!({"id": ""})),
            ChatEvent::ToolError {
                id: None,
                error: "Tool execution failed".into(),
            }
        );
    }

    #[test]
    fn test_web_results_alias() {
        match canonicalize("web_results", json!({"results": [{"url": "https://a"}, {"title": "no url"}]})) {
            ChatEvent::WebSources { sources } => {
                assert_eq!(sources, vec![WebSource::new("https://a")]);
            }
            other => panic!("Expected WebSources, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(
            canonicalize("error", json!({"message": "boom"})),
            ChatEvent::Error { message: "boom".into() }
        );
        assert_eq!(
            canonicalize("error", json!("plain")),
            ChatEvent::Error { message: "plain".into() }
        );
        assert_eq!(
            canonicalize("error", json!({})),
            ChatEvent::Error { message: FALLBACK_ERROR_MESSAGE.into() }
        );
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        assert_eq!(
            canonicalize("heartbeat", json!(null)),
            ChatEvent::Ignored { name: "heartbeat".into() }
        );
    }

    #[test]
    fn test_timeline_allow_list() {
        assert!(route(RawEvent::new("tool_success", json!({}))).timeline.is_some());
        assert!(route(RawEvent::new("web_results", json!({}))).timeline.is_some());
        assert!(route(RawEvent::new("answer_chunk", json!({"chunk": "x"}))).timeline.is_none());
        assert!(route(RawEvent::new("tool", json!({"id": "t"}))).timeline.is_none());
    }
}
