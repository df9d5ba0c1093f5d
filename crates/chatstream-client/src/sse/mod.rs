mod buffering;
mod decoder;

pub use buffering::CircularLineBuffer;
pub use decoder::{decode_sse_stream, EventStream, SseDecoder, DEFAULT_EVENT_NAME};
