use chatstream_types::{
    ChatEvent, Citation, CitationSet, Completion, FormattedMessage, MessageType, ServerMessage,
    StreamingState, ToolCall, ToolCallStatus,
};
use serde_json::json;

#[test]
fn test_formatted_message_serialization() {
    let msg = FormattedMessage::user("Hello");
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["type"], "user_query");
    assert_eq!(json["content"], "Hello");
    assert!(json.get("thinking").is_none());
}

#[test]
fn test_error_message_is_bot() {
    let msg = FormattedMessage::error("boom");
    assert_eq!(msg.message_type, MessageType::Error);
    assert!(msg.is_bot());
    assert!(!msg.is_user());
}

#[test]
fn test_citation_deserialization_aliases() {
    let json = r#"{"_id":"c1","recordId":"r1","content":"snippet","recordName":"report.pdf","webUrl":"https://x"}"#;
    let citation: Citation = serde_json::from_str(json).unwrap();
    assert_eq!(citation.id, "c1");
    assert_eq!(citation.source_id.as_deref(), Some("r1"));
    assert_eq!(citation.source_name.as_deref(), Some("report.pdf"));
    assert_eq!(citation.url.as_deref(), Some("https://x"));
}

#[test]
fn test_citation_set_serializes_as_list() {
    let set: CitationSet = vec![Citation::new("a", "1"), Citation::new("a", "2")]
        .into_iter()
        .collect();
    let json = serde_json::to_value(&set).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);

    let back: CitationSet = serde_json::from_value(json).unwrap();
    assert_eq!(back, set);
}

#[test]
fn test_streaming_state_keeps_tool_call_order() {
    let mut state = StreamingState::new();
    state
        .tool_calls
        .insert("b".into(), ToolCall::running("b", "second", json!({})));
    state
        .tool_calls
        .insert("a".into(), ToolCall::running("a", "first", json!({})));

    let names: Vec<_> = state.tool_calls_vec().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["second", "first"]);
}

#[test]
fn test_tool_call_deserialization() {
    let json = r#"{"id":"t1","name":"search","args":{"q":"x"},"status":"completed","result":"ok"}"#;
    let call: ToolCall = serde_json::from_str(json).unwrap();
    assert_eq!(call.status, ToolCallStatus::Completed);
    assert_eq!(call.result, Some(json!("ok")));
}

#[test]
fn test_complete_event_equality_uses_final_message() {
    let a = ChatEvent::Complete(Completion::from_message(ServerMessage::bot("done")));
    let b = ChatEvent::Complete(Completion::from_message(ServerMessage::bot("done")));
    let c = ChatEvent::Complete(Completion::from_message(ServerMessage::bot("other")));
    assert_eq!(a, b);
    assert_ne!(a, c);
}
