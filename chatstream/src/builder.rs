//! High-level builder for chat sessions

use crate::{ChatSession, ClientConfig, HttpChatTransport, SessionConfig};
use anyhow::{Context, Result};
use chatstream_client::ChatTransport;
use chatstream_types::ChatMode;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`ChatSession`] talking HTTP, or any custom transport.
///
/// # Example
///
/// ```rust,no_run
/// use chatstream::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let mut chat = ChatSessionBuilder::new()
///     .base_url("http://localhost:3000")
///     .bearer_token("token")
///     .mode(ChatMode::Knowledge)
///     .build()?;
///
/// let mut handle = chat.ask("What changed in the Q3 report?").await?;
/// while let Some(update) = handle.recv().await {
///     if let SessionUpdate::Finalized { message, .. } = update {
///         println!("{}", message.content);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChatSessionBuilder {
    base_url: Option<String>,
    api_prefix: Option<String>,
    bearer_token: Option<String>,
    read_timeout: Option<Duration>,
    client_config: Option<ClientConfig>,
    transport: Option<Arc<dyn ChatTransport>>,

    mode: ChatMode,
    agent_id: Option<String>,
    conversation_id: Option<String>,
    session_config: SessionConfig,
}

impl Default for ChatSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSessionBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            api_prefix: None,
            bearer_token: None,
            read_timeout: None,
            client_config: None,
            transport: None,
            mode: ChatMode::default(),
            agent_id: None,
            conversation_id: None,
            session_config: SessionConfig::default(),
        }
    }

    /// Server root, e.g. `http://localhost:3000` (required unless a
    /// client config or transport is given)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Path prefix in front of every endpoint (default: `/api/v1`)
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Longest silence allowed between two reads of the answer stream
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Use a complete client configuration instead of the individual setters
    pub fn client_config(mut self, config: ClientConfig) -> Self {
        self.client_config = Some(config);
        self
    }

    /// Use a custom transport (a replayed recording, for instance)
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Build the session
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - neither a transport, a client config nor a base URL was given
    /// - the HTTP client cannot be created (e.g. malformed token)
    pub fn build(self) -> Result<ChatSession> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => {
                let config = match self.client_config {
                    Some(config) => config,
                    None => {
                        let base_url = self
                            .base_url
                            .context("Base URL is required. Call .base_url(url)")?;
                        let mut config = ClientConfig::new(base_url);
                        if let Some(prefix) = self.api_prefix {
                            config = config.with_api_prefix(prefix);
                        }
                        if let Some(token) = self.bearer_token {
                            config = config.with_bearer_token(token);
                        }
                        if let Some(timeout) = self.read_timeout {
                            config = config.with_read_timeout(timeout);
                        }
                        config
                    }
                };
                let transport =
                    HttpChatTransport::new(config).context("Failed to create HTTP transport")?;
                Arc::new(transport) as Arc<dyn ChatTransport>
            }
        };

        let mut session = ChatSession::new(transport, self.session_config).with_mode(self.mode);
        if let Some(agent_id) = self.agent_id {
            session = session.with_agent(agent_id);
        }
        if let Some(conversation_id) = self.conversation_id {
            session = session.with_conversation(conversation_id);
        }
        Ok(session)
    }
}
