//! One conversation view: a transport, a reconciling session and at most
//! one live stream.

use chatstream_client::{ChatTransport, EventStream};
use chatstream_session::{
    spawn_drive, Outcome, Result, SessionConfig, SessionUpdate, StreamSession, Transcript,
};
use chatstream_types::{ChatMode, ChatRequest, RawEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

struct ActiveStream {
    cancel: CancellationToken,
    task: JoinHandle<(StreamSession, Outcome)>,
}

/// Conversation view over a [`ChatTransport`].
///
/// The [`StreamSession`] is moved into the stream task while an answer is
/// in flight and comes back when that task ends, so there is never more
/// than one writer. Sending a new message first aborts and reclaims the
/// previous stream.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    config: SessionConfig,
    mode: ChatMode,
    agent_id: Option<String>,
    session: Option<StreamSession>,
    active: Option<ActiveStream>,
}

impl ChatSession {
    pub fn new(transport: Arc<dyn ChatTransport>, config: SessionConfig) -> Self {
        Self {
            transport,
            session: Some(StreamSession::new(config.clone())),
            config,
            mode: ChatMode::default(),
            agent_id: None,
            active: None,
        }
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Continue an existing server-side conversation
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        if let Some(session) = self.session.as_mut() {
            session.set_conversation_id(conversation_id);
        }
        self
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Send a message and start streaming its answer.
    ///
    /// Transport failures do not surface here: they end up as the error
    /// message of the turn, delivered through the handle like any other
    /// update.
    pub async fn send(&mut self, request: ChatRequest) -> Result<SessionHandle> {
        self.reclaim(true).await?;

        let mut session = self
            .session
            .take()
            .unwrap_or_else(|| StreamSession::new(self.config.clone()));
        let request = self.prepare(request, &session);
        session.begin_turn(&request.message);

        let events: EventStream = match self.transport.open_stream(self.mode, &request).await {
            Ok(events) => events,
            Err(e) => Box::pin(futures::stream::iter(vec![Err::<RawEvent, _>(e)])),
        };

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(session.config().channel_capacity.max(1));
        let task = spawn_drive(session, events, cancel.clone(), tx);

        self.active = Some(ActiveStream {
            cancel: cancel.clone(),
            task,
        });
        Ok(SessionHandle {
            updates: rx,
            cancel,
        })
    }

    /// Convenience for `send(ChatRequest::new(message))`
    pub async fn ask(&mut self, message: impl Into<String>) -> Result<SessionHandle> {
        self.send(ChatRequest::new(message)).await
    }

    /// Wait for the in-flight answer to settle.
    ///
    /// The stream task applies backpressure, so the handle must be drained
    /// or dropped for this to return.
    pub async fn wait(&mut self) -> Result<Option<Outcome>> {
        self.reclaim(false).await
    }

    /// Abort the in-flight stream, leaving its state as it was
    pub async fn abort(&mut self) -> Result<Option<Outcome>> {
        self.reclaim(true).await
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    /// Reconciled transcript; `None` while a stream owns the session
    pub fn transcript(&self) -> Option<&Transcript> {
        self.session.as_ref().map(StreamSession::transcript)
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(StreamSession::conversation_id)
    }

    pub fn title(&self) -> Option<&str> {
        self.session.as_ref().and_then(StreamSession::title)
    }

    pub fn session(&self) -> Option<&StreamSession> {
        self.session.as_ref()
    }

    async fn reclaim(&mut self, cancel: bool) -> Result<Option<Outcome>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        if cancel {
            active.cancel.cancel();
        }
        let (session, outcome) = active.task.await?;
        tracing::debug!(?outcome, "Stream task reclaimed");
        self.session = Some(session);
        Ok(Some(outcome))
    }

    fn prepare(&self, mut request: ChatRequest, session: &StreamSession) -> ChatRequest {
        if request.conversation_id.is_none() {
            request.conversation_id = session.conversation_id().map(str::to_string);
        }
        if request.agent_id.is_none() {
            request.agent_id = self.agent_id.clone();
        }
        request
    }
}

/// Receiving end of one streamed answer
pub struct SessionHandle {
    updates: mpsc::Receiver<SessionUpdate>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn updates(&mut self) -> &mut mpsc::Receiver<SessionUpdate> {
        &mut self.updates
    }

    pub async fn recv(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }

    /// Stop the stream; the session keeps whatever was already shown
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn into_stream(self) -> ReceiverStream<SessionUpdate> {
        ReceiverStream::new(self.updates)
    }
}
