pub mod citation;
pub mod tool;
pub mod state;
pub mod message;
pub mod events;
pub mod request;

pub use citation::{Citation, CitationSet, ServerCitation};
pub use tool::{ToolCall, ToolCallStatus, WebSource};
pub use state::{StreamingState, TimelineEvent};
pub use message::{Conversation, FormattedMessage, MessageType, ServerMessage};
pub use events::{ChatEvent, Completion, RawEvent};
pub use request::{Attachment, ChatMode, ChatRequest, Filters, ModelSelection, RequestContext};
