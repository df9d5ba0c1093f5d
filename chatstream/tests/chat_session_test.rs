use std::sync::Arc;
use std::time::Duration;

use chatstream::prelude::*;
use chatstream::ReplayTransport;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast() -> SessionConfig {
    SessionConfig::new()
        .with_drain_interval(Duration::from_millis(1))
        .with_completion_delay(Duration::from_millis(2))
        .with_settle_delay(Duration::from_millis(2))
}

const FIRST_TURN: &str = concat!(
    "event: meta\ndata: {\"conversationId\":\"conv-42\"}\n\n",
    "event: answer_chunk\ndata: {\"chunk\":\"Hello \"}\n\n",
    "event: answer_chunk\ndata: {\"chunk\":\"there [1]\",\"citations\":[{\"_id\":\"c1\",\"content\":\"x\",\"recordId\":\"r1\",\"recordName\":\"guide.pdf\",\"chunkIndex\":1}]}\n\n",
    "event: complete\ndata: {\"conversation\":{\"_id\":\"conv-42\",\"title\":\"Greeting\",\"messages\":[",
    "{\"_id\":\"u1\",\"messageType\":\"user_query\",\"content\":\"hi\"},",
    "{\"_id\":\"b1\",\"messageType\":\"bot_response\",\"content\":\"Hello there [1]\"}]}}\n\n",
);

#[tokio::test]
async fn test_follow_up_reuses_conversation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/conversations/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FIRST_TURN))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/conversations/conv-42/messages/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("event: answer_chunk\ndata: {\"chunk\":\"Again\"}\n\nevent: end\ndata: {}\n\n"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = ChatSessionBuilder::new()
        .base_url(server.uri())
        .session_config(fast())
        .build()
        .unwrap();

    let handle = chat.ask("hi").await.unwrap();
    let updates: Vec<_> = handle.into_stream().collect().await;
    assert_eq!(chat.wait().await.unwrap(), Some(Outcome::Completed));
    assert!(updates
        .iter()
        .any(|u| matches!(u, SessionUpdate::TitleChanged(t) if t == "Greeting")));

    assert_eq!(chat.conversation_id(), Some("conv-42"));
    let answer = chat.transcript().unwrap().last().unwrap().clone();
    assert_eq!(answer.content, "Hello there [1]");

    let structured = StructuredAnswer::build(&answer.content, &answer.citations);
    assert_eq!(structured.cited_ids(), vec!["c1"]);
    assert_eq!(structured.sources[0].label, "guide.pdf");

    let handle = chat.ask("again").await.unwrap();
    drop(handle);
    assert_eq!(chat.wait().await.unwrap(), Some(Outcome::Ended));

    let transcript = chat.transcript().unwrap();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript.last().unwrap().content, "Again");
}

#[tokio::test]
async fn test_http_error_becomes_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut chat = ChatSessionBuilder::new()
        .base_url(server.uri())
        .session_config(fast())
        .build()
        .unwrap();

    let handle = chat.ask("hi").await.unwrap();
    let updates: Vec<_> = handle.into_stream().collect().await;
    assert_eq!(chat.wait().await.unwrap(), Some(Outcome::Failed));

    let last = chat.transcript().unwrap().last().unwrap();
    assert_eq!(last.message_type, MessageType::Error);
    assert_eq!(last.content, chatstream::session::TRANSPORT_FAILURE_MESSAGE);
    assert!(updates
        .iter()
        .any(|u| matches!(u, SessionUpdate::Finalized { outcome: Outcome::Failed, .. })));
}

#[tokio::test]
async fn test_new_send_aborts_previous_stream() {
    // Never-ending first answer: only ever the first chunk
    let slow = "event: answer_chunk\ndata: {\"chunk\":\"first\"}\n\n";
    let transport = Arc::new(ReplayTransport::from_body(slow));
    let mut chat = ChatSessionBuilder::new()
        .transport(transport)
        .session_config(fast().with_completion_delay(Duration::from_secs(30)))
        .build()
        .unwrap();

    let first = chat.ask("one").await.unwrap();
    assert!(chat.is_streaming());

    let second = chat.ask("two").await.unwrap();
    drop(first);
    drop(second);
    let outcome = chat.abort().await.unwrap();
    assert_eq!(outcome, Some(Outcome::Aborted));
    assert!(!chat.is_streaming());

    let transcript = chat.transcript().unwrap();
    let users: Vec<_> = transcript
        .messages()
        .iter()
        .filter(|m| m.is_user())
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(users, vec!["one", "two"]);
}
