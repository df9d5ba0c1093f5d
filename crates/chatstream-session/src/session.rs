use chatstream_client::RoutedEvent;
use chatstream_types::{
    ChatEvent, Citation, Completion, FormattedMessage, MessageType, StreamingState,
    TimelineEvent, ToolCall, WebSource,
};
use chrono::Utc;
use serde_json::Value;
use std::collections::VecDeque;

use crate::config::SessionConfig;
use crate::normalize::normalize_chunk;
use crate::timeline::TimelineLog;
use crate::transcript::Transcript;

/// Shown when the transport fails before any answer text arrived
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Failed to get a response. Please try again.";
const EMPTY_STREAM_MESSAGE: &str = "The server closed the stream without an answer.";

/// Lifecycle of one streamed answer.
///
/// `Idle → Streaming → CompletionPending → Finalized`; any live phase can
/// jump to `Failed`, and `Aborted` freezes whatever was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Streaming,
    CompletionPending,
    Finalized,
    Failed,
    Aborted,
}

impl SessionPhase {
    pub fn is_live(&self) -> bool {
        matches!(self, SessionPhase::Streaming | SessionPhase::CompletionPending)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, SessionPhase::Finalized | SessionPhase::Failed)
    }

    /// No further events are applied
    pub fn is_terminal(&self) -> bool {
        self.is_settled() || *self == SessionPhase::Aborted
    }
}

/// How a finalized answer came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Completion received and reconciled
    Completed,
    /// Stream closed without a completion; accumulated text became final
    Ended,
    /// Server error or transport failure
    Failed,
    Aborted,
}

/// Change published to whoever renders the session
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    Streaming(StreamingState),
    MessageUpserted(FormattedMessage),
    Status {
        status: String,
        message: Option<String>,
    },
    Timeline(TimelineEvent),
    ConversationAssigned(String),
    TitleChanged(String),
    MemorySuggestion(Value),
    Finalized {
        message: FormattedMessage,
        outcome: Outcome,
    },
    Cleared,
    Aborted,
}

/// Owned accumulator/reconciler for the single in-flight answer.
///
/// All mutation goes through `&mut self`; the driver calls `handle` for
/// every routed event, `tick` on the drain cadence, `finalize` once the
/// completion delay has passed and `settle` after the settle delay.
/// Changes queue up in an outbox drained with [`take_updates`](Self::take_updates).
pub struct StreamSession {
    config: SessionConfig,
    phase: SessionPhase,
    state: StreamingState,

    // Everything received so far; `state.content` is always a prefix of it
    received: String,
    pending: VecDeque<String>,
    completion: Option<Completion>,
    outcome: Option<Outcome>,

    provisional_id: Option<String>,
    conversation_id: Option<String>,
    title: Option<String>,
    status: Option<String>,
    memory_suggestions: Vec<Value>,

    transcript: Transcript,
    timeline: TimelineLog,
    updates: Vec<SessionUpdate>,
}

impl StreamSession {
    pub fn new(config: SessionConfig) -> Self {
        let timeline = TimelineLog::with_capacity(config.timeline_capacity);
        Self {
            config,
            phase: SessionPhase::Idle,
            state: StreamingState::new(),
            received: String::new(),
            pending: VecDeque::new(),
            completion: None,
            outcome: None,
            provisional_id: None,
            conversation_id: None,
            title: None,
            status: None,
            memory_suggestions: Vec::new(),
            transcript: Transcript::new(),
            timeline,
            updates: Vec::new(),
        }
    }

    /// Continue an existing conversation
    pub fn with_transcript(mut self, conversation_id: impl Into<String>, transcript: Transcript) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self.transcript = transcript;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn streaming_state(&self) -> &StreamingState {
        &self.state
    }

    /// Full text received for the current answer, revealed or not
    pub fn received_content(&self) -> &str {
        &self.received
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn timeline(&self) -> &TimelineLog {
        &self.timeline
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn memory_suggestions(&self) -> &[Value] {
        &self.memory_suggestions
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Completion is buffered and every chunk has been revealed
    pub fn ready_to_finalize(&self) -> bool {
        self.phase == SessionPhase::CompletionPending && self.pending.is_empty()
    }

    pub fn take_updates(&mut self) -> Vec<SessionUpdate> {
        std::mem::take(&mut self.updates)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start a new turn: clear any previous stream and add the user's
    /// message to the transcript optimistically.
    pub fn begin_turn(&mut self, message: &str) -> FormattedMessage {
        if self.phase.is_live() {
            tracing::warn!("Starting a new turn while a stream was still live");
        }
        self.reset_accumulators();
        self.phase = SessionPhase::Streaming;

        let user_message = FormattedMessage::user(message);
        self.transcript.push(user_message.clone());
        self.updates
            .push(SessionUpdate::MessageUpserted(user_message.clone()));
        user_message
    }

    fn reset_accumulators(&mut self) {
        self.state.reset();
        self.received.clear();
        self.pending.clear();
        self.completion = None;
        self.outcome = None;
        self.provisional_id = None;
        self.status = None;
        self.timeline.clear();
    }

    fn ensure_streaming(&mut self) {
        if !self.phase.is_live() {
            self.reset_accumulators();
            self.phase = SessionPhase::Streaming;
        }
    }

    /// Apply one routed event
    pub fn handle(&mut self, routed: RoutedEvent) {
        if self.phase.is_terminal() {
            tracing::debug!(event = routed.event.name(), phase = ?self.phase, "Event after stream end dropped");
            return;
        }

        if let Some(entry) = routed.timeline {
            self.timeline.push(entry.clone());
            self.updates.push(SessionUpdate::Timeline(entry));
        }

        match routed.event {
            ChatEvent::Status { status, message } => self.on_status(status, message),
            ChatEvent::AnswerChunk { chunk, citations } => self.on_answer_chunk(&chunk, citations),
            ChatEvent::ThinkingChunk { chunk } => self.on_thinking_chunk(&chunk),
            ChatEvent::ToolCall { id, name, args } => self.on_tool_call(id, name, args),
            ChatEvent::ToolResult { id, result } => self.on_tool_result(id, result),
            ChatEvent::ToolError { id, error } => self.on_tool_error(id, error),
            ChatEvent::WebSources { sources } => self.on_web_sources(sources),
            ChatEvent::Progress { .. } => {}
            ChatEvent::Meta {
                conversation_id,
                message_id,
                ..
            } => self.on_meta(conversation_id, message_id),
            ChatEvent::TitleGenerated { title } => self.on_title(title),
            ChatEvent::MemorySuggestion { suggestion } => {
                self.memory_suggestions.push(suggestion.clone());
                self.updates.push(SessionUpdate::MemorySuggestion(suggestion));
            }
            ChatEvent::Complete(completion) => self.on_complete(completion),
            ChatEvent::Error { message } => {
                tracing::warn!(%message, "Server reported a stream error");
                self.fail(message);
            }
            ChatEvent::Ignored { .. } => {}
        }
    }

    /// Reveal one queued chunk. Returns false when nothing was queued.
    pub fn tick(&mut self) -> bool {
        let Some(chunk) = self.pending.pop_front() else {
            return false;
        };
        self.state.content.push_str(&chunk);
        self.publish_streaming();
        true
    }

    /// The byte stream ended. Without a completion the accumulated text
    /// is finalized once it has been revealed.
    pub fn stream_ended(&mut self) {
        match self.phase {
            SessionPhase::Streaming => {
                tracing::warn!("Stream ended without a completion event");
                self.completion = Some(Completion::default());
                self.phase = SessionPhase::CompletionPending;
            }
            SessionPhase::Idle => {
                self.fail(EMPTY_STREAM_MESSAGE.to_string());
            }
            _ => {}
        }
    }

    /// Transport-level failure (request rejected, connection dropped)
    pub fn fail_transport(&mut self, error: &dyn std::error::Error) {
        tracing::warn!("Chat stream transport failed: {}", error);
        if self.phase.is_terminal() {
            return;
        }
        self.fail(TRANSPORT_FAILURE_MESSAGE.to_string());
    }

    /// Swap the provisional message for the authoritative one
    pub fn finalize(&mut self) {
        if self.phase != SessionPhase::CompletionPending {
            return;
        }
        self.flush_pending();

        let completion = self.completion.take().unwrap_or_default();
        if let Some(id) = completion.conversation_id() {
            self.adopt_conversation(id.to_string());
        }
        if let Some(title) = completion.title() {
            self.on_title(title.to_string());
        }

        let server_message = completion.final_message().cloned();
        if server_message.is_none() && self.received.trim().is_empty() {
            self.fail(EMPTY_STREAM_MESSAGE.to_string());
            return;
        }
        let outcome = if server_message.is_some() {
            Outcome::Completed
        } else {
            Outcome::Ended
        };

        let base = match server_message {
            Some(message) => FormattedMessage::from_server(message),
            None => FormattedMessage::provisional_bot(),
        };
        let message = self.merge_accumulated(base);
        self.commit_final(message, SessionPhase::Finalized, outcome);
    }

    /// Clear the streaming state once the final message is in place
    pub fn settle(&mut self) {
        self.state.reset();
        self.pending.clear();
        self.received.clear();
        self.provisional_id = None;
        self.updates.push(SessionUpdate::Cleared);
    }

    /// Stop reacting to the stream. In-flight state is left untouched.
    pub fn abort(&mut self) {
        if self.phase.is_settled() {
            return;
        }
        tracing::info!(pending = self.pending.len(), "Chat stream aborted");
        self.phase = SessionPhase::Aborted;
        self.outcome = Some(Outcome::Aborted);
        self.updates.push(SessionUpdate::Aborted);
    }

    pub fn set_conversation_id(&mut self, conversation_id: impl Into<String>) {
        self.conversation_id = Some(conversation_id.into());
    }

    // ------------------------------------------------------------------
    // Event handlers
    // ------------------------------------------------------------------

    fn on_status(&mut self, status: String, message: Option<String>) {
        self.status = Some(message.clone().unwrap_or_else(|| status.clone()));
        self.updates.push(SessionUpdate::Status { status, message });
    }

    fn on_answer_chunk(&mut self, chunk: &str, citations: Vec<Citation>) {
        self.ensure_streaming();
        self.state.is_active = true;
        self.ensure_provisional();

        self.state.citations.merge(citations);

        let chunk = normalize_chunk(chunk);
        if chunk.is_empty() {
            return;
        }
        self.received.push_str(&chunk);
        self.pending.push_back(chunk);
    }

    fn on_thinking_chunk(&mut self, chunk: &str) {
        self.ensure_streaming();
        self.ensure_provisional();
        self.state.thinking.push_str(chunk);
        self.publish_streaming();
    }

    fn on_tool_call(&mut self, id: Option<String>, name: Option<String>, args: Value) {
        let Some(id) = id else {
            tracing::debug!("Dropping tool_call without an id");
            return;
        };
        self.ensure_streaming();
        self.ensure_provisional();

        match self.state.tool_calls.get_mut(&id) {
            Some(existing) => {
                if let Some(name) = name {
                    existing.name = name;
                }
                if !args.is_null() {
                    existing.args = args;
                }
            }
            None => {
                let call = ToolCall::running(id.clone(), name.unwrap_or_default(), args);
                self.state.tool_calls.insert(id, call);
            }
        }
        self.publish_streaming();
    }

    fn on_tool_result(&mut self, id: Option<String>, result: Value) {
        let Some(id) = id else {
            tracing::debug!("Dropping tool_result without an id");
            return;
        };
        self.ensure_streaming();
        self.ensure_provisional();
        self.state
            .tool_calls
            .entry(id.clone())
            .or_insert_with(|| ToolCall::running(id, String::new(), Value::Null))
            .complete(result);
        self.publish_streaming();
    }

    fn on_tool_error(&mut self, id: Option<String>, error: String) {
        let Some(id) = id else {
            tracing::debug!("Dropping tool_error without an id");
            return;
        };
        self.ensure_streaming();
        self.ensure_provisional();
        self.state
            .tool_calls
            .entry(id.clone())
            .or_insert_with(|| ToolCall::running(id, String::new(), Value::Null))
            .fail(error);
        self.publish_streaming();
    }

    fn on_web_sources(&mut self, sources: Vec<WebSource>) {
        self.ensure_streaming();
        let mut added = false;
        for source in sources {
            if !self.state.web_sources.iter().any(|s| s.url == source.url) {
                self.state.web_sources.push(source);
                added = true;
            }
        }
        if added {
            self.ensure_provisional();
            self.publish_streaming();
        }
    }

    fn on_meta(&mut self, conversation_id: Option<String>, message_id: Option<String>) {
        if let Some(id) = conversation_id {
            self.adopt_conversation(id);
        }
        if let Some(id) = message_id {
            self.state.message_id = Some(id);
        }
    }

    fn on_title(&mut self, title: String) {
        if self.title.as_deref() == Some(title.as_str()) {
            return;
        }
        self.title = Some(title.clone());
        self.updates.push(SessionUpdate::TitleChanged(title));
    }

    fn on_complete(&mut self, completion: Completion) {
        if self.phase == SessionPhase::CompletionPending {
            tracing::debug!("Duplicate completion ignored");
            return;
        }
        self.ensure_streaming();
        tracing::info!(queued = self.pending.len(), "Completion received");
        self.completion = Some(completion);
        self.phase = SessionPhase::CompletionPending;
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn adopt_conversation(&mut self, id: String) {
        if id.is_empty() || self.conversation_id.as_deref() == Some(id.as_str()) {
            return;
        }
        self.conversation_id = Some(id.clone());
        self.updates.push(SessionUpdate::ConversationAssigned(id));
    }

    fn ensure_provisional(&mut self) {
        if self.provisional_id.is_some() {
            return;
        }
        let message = FormattedMessage::provisional_bot();
        self.provisional_id = Some(message.id.clone());
        self.transcript.push(message);
    }

    /// Mirror the streaming state into the provisional transcript entry
    fn publish_streaming(&mut self) {
        if let Some(id) = self.provisional_id.clone() {
            let state = &self.state;
            if let Some(message) = self.transcript.get_mut(&id) {
                message.content = state.content.clone();
                message.citations = state.citations.to_vec();
                message.thinking = (!state.thinking.is_empty()).then(|| state.thinking.clone());
                message.tool_calls = state.tool_calls_vec();
                message.web_sources = state.web_sources.clone();
                message.updated_at = Utc::now();
                self.updates.push(SessionUpdate::MessageUpserted(message.clone()));
            }
        }
        self.updates.push(SessionUpdate::Streaming(self.state.clone()));
    }

    fn flush_pending(&mut self) {
        while let Some(chunk) = self.pending.pop_front() {
            self.state.content.push_str(&chunk);
        }
    }

    /// Accumulated data wins wherever the final payload left something out
    fn merge_accumulated(&self, mut message: FormattedMessage) -> FormattedMessage {
        if message.content.is_empty() {
            message.content = self.received.clone();
        }
        if !self.state.citations.is_empty() {
            message.citations = self.state.citations.to_vec();
        }
        if !self.state.tool_calls.is_empty() {
            message.tool_calls = self.state.tool_calls_vec();
        }
        if !self.state.thinking.is_empty() {
            message.thinking = Some(self.state.thinking.clone());
        }
        if !self.state.web_sources.is_empty() {
            message.web_sources = self.state.web_sources.clone();
        }
        message.workflow_steps = self.timeline.snapshot();
        message.updated_at = Utc::now();
        message
    }

    fn fail(&mut self, error_text: String) {
        self.flush_pending();

        let message = if self.received.trim().is_empty() {
            let mut message = FormattedMessage::error(error_text);
            message.workflow_steps = self.timeline.snapshot();
            message
        } else {
            // Partial answer beats no answer
            let mut message = self.merge_accumulated(FormattedMessage::provisional_bot());
            message.message_type = MessageType::BotResponse;
            message
        };
        self.commit_final(message, SessionPhase::Failed, Outcome::Failed);
    }

    fn commit_final(&mut self, message: FormattedMessage, phase: SessionPhase, outcome: Outcome) {
        let stored = match self.provisional_id.take() {
            Some(id) => self.transcript.replace(&id, message).clone(),
            None => {
                self.transcript.push(message.clone());
                message
            }
        };

        self.state.content = stored.content.clone();
        self.state.is_active = false;
        self.phase = phase;
        self.outcome = Some(outcome);

        tracing::info!(outcome = ?outcome, chars = stored.content.len(), "Answer finalized");

        self.updates.push(SessionUpdate::Streaming(self.state.clone()));
        self.updates.push(SessionUpdate::MessageUpserted(stored.clone()));
        self.updates.push(SessionUpdate::Finalized {
            message: stored,
            outcome,
        });
    }
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatstream_client::route;
    use chatstream_types::{RawEvent, ToolCallStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn feed(session: &mut StreamSession, name: &str, data: Value) {
        session.handle(route(RawEvent::new(name, data)));
    }

    fn drain(session: &mut StreamSession) -> Vec<String> {
        let mut snapshots = Vec::new();
        while session.tick() {
            snapshots.push(session.streaming_state().content.clone());
        }
        snapshots
    }

    #[test]
    fn test_prefix_invariant_while_draining() {
        let mut session = StreamSession::default();
        session.begin_turn("hi");

        let chunks = ["The ", "quick ", "brown ", "fox"];
        let mut snapshots = Vec::new();
        for chunk in chunks {
            feed(&mut session, "answer_chunk", json!({ "chunk": chunk }));
            // Network may outpace the drain: tick only every other chunk
            if chunk.len() % 2 == 0 {
                session.tick();
                snapshots.push(session.streaming_state().content.clone());
            }
        }
        snapshots.extend(drain(&mut session));

        let received = session.received_content().to_string();
        assert_eq!(received, "The quick brown fox");
        for shown in &snapshots {
            assert!(received.starts_with(shown.as_str()), "{:?} is not a prefix", shown);
        }
        assert_eq!(snapshots.last().unwrap(), "The quick brown fox");
    }

    #[test]
    fn test_citation_idempotence() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        let citation = json!({"_id": "c1", "content": "snippet", "chunkIndex": 1});
        feed(&mut session, "answer_chunk", json!({"chunk": "a [1]", "citations": [citation.clone()]}));
        feed(&mut session, "answer_chunk", json!({"chunk": " b [1]", "citations": [citation]}));

        assert_eq!(session.streaming_state().citations.len(), 1);
    }

    #[test]
    fn test_citations_without_id_are_dropped() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(
            &mut session,
            "answer_chunk",
            json!({"chunk": "a [1] b [2]", "citations": [{"bad": true}, {"_id": "c1"}, {"content": "no id"}]}),
        );

        let ids: Vec<_> = session
            .streaming_state()
            .citations
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1"]);
    }

    #[test]
    fn test_completion_never_regresses_content() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "Hello wor"}));
        session.tick();
        assert_eq!(session.streaming_state().content, "Hello wor");

        feed(&mut session, "complete", json!({"content": "Hello world"}));
        assert!(session.ready_to_finalize());
        session.finalize();

        assert_eq!(session.phase(), SessionPhase::Finalized);
        assert_eq!(session.streaming_state().content, "Hello world");
        let last = session.transcript().last().unwrap();
        assert_eq!(last.content, "Hello world");
        assert_eq!(session.transcript().len(), 2);
    }

    #[test]
    fn test_completion_waits_for_queue() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "one "}));
        feed(&mut session, "answer_chunk", json!({"chunk": "two"}));
        feed(&mut session, "complete", json!({"content": "one two"}));

        assert_eq!(session.phase(), SessionPhase::CompletionPending);
        assert!(!session.ready_to_finalize());
        session.tick();
        assert!(!session.ready_to_finalize());
        session.tick();
        assert!(session.ready_to_finalize());
    }

    #[test]
    fn test_error_preserves_partial_content() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "Partial answer"}));
        feed(&mut session, "error", json!({"message": "boom"}));

        assert_eq!(session.phase(), SessionPhase::Failed);
        let last = session.transcript().last().unwrap();
        assert_eq!(last.content, "Partial answer");
        assert_eq!(last.message_type, MessageType::BotResponse);
        assert!(!session.streaming_state().is_active);
    }

    #[test]
    fn test_error_without_content_becomes_error_message() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "status", json!({"status": "searching"}));
        feed(&mut session, "error", json!({"message": "boom"}));

        let last = session.transcript().last().unwrap();
        assert_eq!(last.content, "boom");
        assert_eq!(last.message_type, MessageType::Error);
        assert_eq!(last.workflow_steps.len(), 2);
    }

    #[test]
    fn test_accumulated_citations_override_missing_final() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(
            &mut session,
            "answer_chunk",
            json!({"chunk": "x [1]", "citations": [{"_id": "c1", "content": "s"}]}),
        );
        feed(&mut session, "thinking_chunk", json!({"chunk": "pondering"}));
        feed(&mut session, "tool_call", json!({"id": "t1", "name": "search"}));
        drain(&mut session);
        feed(
            &mut session,
            "complete",
            json!({"conversation": {"_id": "conv-9", "title": "T", "messages": [
                {"_id": "u1", "messageType": "user_query", "content": "q"},
                {"_id": "b1", "messageType": "bot_response", "content": "x [1]"}
            ]}}),
        );
        session.finalize();

        let last = session.transcript().last().unwrap();
        assert_eq!(last.id, "b1");
        assert_eq!(last.citations.len(), 1);
        assert_eq!(last.thinking.as_deref(), Some("pondering"));
        assert_eq!(last.tool_calls.len(), 1);
        assert_eq!(session.conversation_id(), Some("conv-9"));
        assert_eq!(session.title(), Some("T"));
    }

    #[test]
    fn test_final_citations_used_when_none_streamed() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "y"}));
        drain(&mut session);
        feed(
            &mut session,
            "complete",
            json!({"message": {"_id": "b2", "messageType": "bot_response", "content": "y [1]",
                   "citations": [{"citationId": "c5", "citationData": {"content": "z"}}]}}),
        );
        session.finalize();
        assert_eq!(session.transcript().last().unwrap().citations[0].id, "c5");
    }

    #[test]
    fn test_final_timestamp_matches_provisional() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "a"}));
        let provisional_created = session.transcript().last().unwrap().created_at;
        drain(&mut session);
        feed(
            &mut session,
            "complete",
            json!({"message": {"_id": "b3", "messageType": "bot_response", "content": "a",
                   "createdAt": "2020-01-01T00:00:00Z"}}),
        );
        session.finalize();
        assert_eq!(session.transcript().last().unwrap().created_at, provisional_created);
    }

    #[test]
    fn test_tool_lifecycle_and_missing_ids() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "tool", json!({"name": "no id"}));
        feed(&mut session, "tool_call", json!({"id": "t1", "name": "search", "args": {"q": 1}}));
        feed(&mut session, "tool_result", json!({"name": "still no id"}));
        feed(&mut session, "tool_success", json!({"id": "t1", "result": "ok"}));
        feed(&mut session, "tool_error", json!({"id": "t2", "error": "denied"}));

        let calls = &session.streaming_state().tool_calls;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls["t1"].status, ToolCallStatus::Completed);
        assert_eq!(calls["t1"].args, json!({"q": 1}));
        assert_eq!(calls["t2"].status, ToolCallStatus::Error);
    }

    #[test]
    fn test_thinking_is_published_immediately() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        session.take_updates();
        feed(&mut session, "reasoning_chunk", json!({"chunk": "step 1"}));

        let updates = session.take_updates();
        assert!(updates.iter().any(|u| matches!(
            u,
            SessionUpdate::Streaming(state) if state.thinking == "step 1"
        )));
        assert!(!session.has_pending());
    }

    #[test]
    fn test_stream_end_without_completion_finalizes_accumulated() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "only part"}));
        session.stream_ended();
        assert!(!session.ready_to_finalize());
        drain(&mut session);
        session.finalize();

        assert_eq!(session.outcome(), Some(Outcome::Ended));
        assert_eq!(session.transcript().last().unwrap().content, "only part");
    }

    #[test]
    fn test_transport_failure_without_content() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        let error = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        session.fail_transport(&error);

        let last = session.transcript().last().unwrap();
        assert_eq!(last.content, TRANSPORT_FAILURE_MESSAGE);
        assert_eq!(last.message_type, MessageType::Error);
    }

    #[test]
    fn test_abort_leaves_state_in_place() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "half"}));
        session.abort();

        assert_eq!(session.phase(), SessionPhase::Aborted);
        assert!(session.has_pending());
        feed(&mut session, "answer_chunk", json!({"chunk": " more"}));
        assert_eq!(session.received_content(), "half");
    }

    #[test]
    fn test_new_turn_resets_accumulators() {
        let mut session = StreamSession::default();
        session.begin_turn("first");
        feed(&mut session, "answer_chunk", json!({"chunk": "old", "citations": [{"_id": "c1"}]}));
        session.abort();

        session.begin_turn("second");
        assert_eq!(session.phase(), SessionPhase::Streaming);
        assert!(session.streaming_state().citations.is_empty());
        assert!(!session.has_pending());
        assert_eq!(session.received_content(), "");
    }

    #[test]
    fn test_settle_clears_streaming_state() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "answer_chunk", json!({"chunk": "done"}));
        feed(&mut session, "end", json!({}));
        drain(&mut session);
        session.finalize();
        session.settle();

        assert_eq!(session.streaming_state(), &StreamingState::default());
        assert_eq!(session.transcript().last().unwrap().content, "done");
    }

    #[test]
    fn test_meta_title_and_memory() {
        let mut session = StreamSession::default();
        session.begin_turn("q");
        feed(&mut session, "meta", json!({"conversationId": "c1", "messageId": "m1"}));
        feed(&mut session, "title_generated", json!({"title": "Weather"}));
        feed(&mut session, "memory_suggestion", json!({"text": "likes rain"}));

        assert_eq!(session.conversation_id(), Some("c1"));
        assert_eq!(session.streaming_state().message_id.as_deref(), Some("m1"));
        assert_eq!(session.title(), Some("Weather"));
        assert_eq!(session.memory_suggestions().len(), 1);
        assert_eq!(session.timeline().len(), 1);
    }
}
