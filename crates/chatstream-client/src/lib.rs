pub mod config;
pub mod error;
pub mod router;
pub mod sse;
pub mod transport;

pub use config::{ClientConfig, EndpointTemplate, Endpoints};
pub use error::{ClientError, Result};
pub use router::{canonicalize, is_timeline_event, route, RoutedEvent, TIMELINE_EVENTS};
pub use sse::{decode_sse_stream, CircularLineBuffer, EventStream, SseDecoder};
pub use transport::{ChatTransport, HttpChatTransport, ReplayTransport};
