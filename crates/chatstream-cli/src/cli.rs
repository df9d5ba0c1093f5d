use chatstream::{ChatMode, ChatRequest};
use clap::Parser;
use std::path::PathBuf;

/// Send one message to a chat server and stream the answer to stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatstream", version)]
pub struct Cli {
    /// Conversation mode: chat, knowledge, agent, deep-research or image.
    #[arg(long, default_value = "chat")]
    pub mode: ChatMode,

    /// Continue an existing conversation.
    #[arg(long, value_name = "ID")]
    pub conversation: Option<String>,

    /// Agent to talk to (required for agent mode).
    #[arg(long, value_name = "ID")]
    pub agent: Option<String>,

    /// Let the server search the web.
    #[arg(long, default_value_t = false)]
    pub web_search: bool,

    /// Ask for visible reasoning.
    #[arg(long, default_value_t = false)]
    pub reasoning: bool,

    /// Model key to request.
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Restrict retrieval to these knowledge bases (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub kb: Vec<String>,

    /// Print reasoning text to stderr as it arrives.
    #[arg(long, default_value_t = false)]
    pub show_thinking: bool,

    /// Read configuration from this file instead of config/default.toml.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Render a recorded event-stream body instead of calling the server.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Message to send.
    pub message: String,
}

impl Cli {
    pub fn request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(self.message.clone())
            .with_web_search(self.web_search)
            .with_reasoning(self.reasoning);

        if let Some(conversation) = &self.conversation {
            request = request.with_conversation(conversation.clone());
        }
        if let Some(agent) = &self.agent {
            request = request.with_agent(agent.clone());
        }
        if self.model.is_some() {
            request = request.with_model(self.model.clone(), None);
        }
        if !self.kb.is_empty() {
            request = request.with_filters(Vec::new(), self.kb.clone());
        }
        request
    }
}
