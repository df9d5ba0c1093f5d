//! # Chatstream - streamed chat answers for Rust
//!
//! Chatstream consumes a chat server's `text/event-stream` answers and turns
//! them into render-ready state:
//! - **SSE decoding** tolerant of arbitrary read boundaries and bad records
//! - **Event routing** that folds legacy event names into one vocabulary
//! - **Typing-cadence reveal** of answer text, decoupled from network speed
//! - **Completion reconciliation** that never regresses shown content
//! - **Answer structuring** into blocks, citation anchors and sources
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chatstream::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut chat = ChatSessionBuilder::new()
//!         .base_url("http://localhost:3000")
//!         .bearer_token(std::env::var("CHATSTREAM_TOKEN")?)
//!         .build()?;
//!
//!     let mut handle = chat.ask("Summarise the onboarding guide").await?;
//!     while let Some(update) = handle.recv().await {
//!         if let SessionUpdate::Streaming(state) = update {
//!             println!("{}", state.content);
//!         }
//!     }
//!
//!     chat.wait().await?;
//!     if let Some(answer) = chat.transcript().and_then(|t| t.last()) {
//!         let structured = StructuredAnswer::build(&answer.content, &answer.citations);
//!         for source in structured.sources {
//!             println!("{} ({})", source.label, source.origin_label);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **chatstream-types**: data model and canonical event vocabulary
//! - **chatstream-client**: SSE decoder, event router, HTTP/replay transports
//! - **chatstream-session**: accumulator, drain loop and completion reconciler
//! - **chatstream-answer**: citation splitting, block parsing, source grouping

pub use chatstream_answer as answer;
pub use chatstream_client as client;
pub use chatstream_session as session;
pub use chatstream_types as types;

pub use chatstream_answer::{RichChunk, Source, StructuredAnswer};
pub use chatstream_client::{ChatTransport, ClientConfig, ClientError, HttpChatTransport, ReplayTransport};
pub use chatstream_session::{Outcome, SessionConfig, SessionError, SessionUpdate, StreamSession, Transcript};
pub use chatstream_types::{ChatEvent, ChatMode, ChatRequest, Citation, FormattedMessage, StreamingState};

pub mod builder;
pub mod chat;

pub use builder::ChatSessionBuilder;
pub use chat::{ChatSession, SessionHandle};

/// Commonly used types
pub mod prelude {
    pub use crate::builder::ChatSessionBuilder;
    pub use crate::chat::{ChatSession, SessionHandle};
    pub use crate::answer::{RichChunk, StructuredAnswer};
    pub use crate::session::{Outcome, SessionConfig, SessionUpdate};
    pub use crate::types::{ChatMode, ChatRequest, FormattedMessage, MessageType};
    pub use anyhow::Result;
}
