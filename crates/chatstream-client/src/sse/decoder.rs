use bytes::Bytes;
use chatstream_types::RawEvent;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use std::pin::Pin;

use super::buffering::CircularLineBuffer;
use crate::error::{ClientError, Result};

/// Event name used for a `data:` line with no preceding `event:` line
pub const DEFAULT_EVENT_NAME: &str = "message";

/// Decoded events in arrival order
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RawEvent>> + Send>>;

/// Incremental `event:`/`data:` decoder.
///
/// Feed it raw byte chunks as they arrive. The event name set by an
/// `event:` line applies to following `data:` lines until the next blank
/// line or the next `event:` line. A `data:` line whose JSON does not parse
/// is dropped.
pub struct SseDecoder {
    buffer: CircularLineBuffer,
    current_event: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            buffer: CircularLineBuffer::with_capacity(4096),
            current_event: None,
        }
    }

    /// Push bytes and return every event completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<RawEvent> {
        self.buffer.extend(bytes);

        let mut events = Vec::new();
        while let Some(line) = self.buffer.next_line() {
            match line {
                Ok(line) => events.extend(self.decode_line(&line)),
                Err(e) => tracing::debug!("Skipping non UTF-8 line: {}", e),
            }
        }
        events
    }

    /// Flush a trailing line that never got its newline
    pub fn finish(&mut self) -> Option<RawEvent> {
        match self.buffer.take_remaining()? {
            Ok(line) => self.decode_line(&line),
            Err(e) => {
                tracing::debug!("Skipping non UTF-8 trailing line: {}", e);
                None
            }
        }
    }

    fn decode_line(&mut self, line: &str) -> Option<RawEvent> {
        if line.is_empty() {
            self.current_event = None;
            return None;
        }

        if line.starts_with(':') {
            return None;
        }

        if let Some(name) = line.strip_prefix("event:") {
            let name = name.trim();
            self.current_event = (!name.is_empty()).then(|| name.to_string());
            return None;
        }

        let data = line.strip_prefix("data:")?;
        let data = data.strip_prefix(' ').unwrap_or(data);

        match serde_json::from_str::<Value>(data) {
            Ok(value) => Some(RawEvent::new(
                self.current_event
                    .clone()
                    .unwrap_or_else(|| DEFAULT_EVENT_NAME.to_string()),
                value,
            )),
            Err(e) => {
                tracing::debug!(
                    event = self.current_event.as_deref().unwrap_or(DEFAULT_EVENT_NAME),
                    "Dropping malformed data line: {}",
                    e
                );
                None
            }
        }
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a chunked byte stream into events.
///
/// A read error is yielded once as `ClientError::Stream` and ends the stream.
pub fn decode_sse_stream<S, E>(byte_stream: S) -> EventStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(byte_stream);
        let mut decoder = SseDecoder::new();

        while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(ClientError::Stream(e.to_string()));
                    return;
                }
            }
        }

        if let Some(event) = decoder.finish() {
            yield Ok(event);
        }
    })
}
