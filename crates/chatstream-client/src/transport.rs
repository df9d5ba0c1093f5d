use async_trait::async_trait;
use bytes::Bytes;
use chatstream_types::{ChatMode, ChatRequest};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::sse::{decode_sse_stream, EventStream};

/// Opens one chat event stream per request.
///
/// The HTTP implementation talks to the server; [`ReplayTransport`] plays back
/// a recorded body, which is what tests and offline rendering use.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open_stream(&self, mode: ChatMode, request: &ChatRequest) -> Result<EventStream>;
}

/// HTTP transport (POST + `text/event-stream` response)
pub struct HttpChatTransport {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpChatTransport {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        if let Some(token) = config.bearer_token.as_deref() {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|_| ClientError::Config("Invalid bearer token format".to_string()))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn open_stream(&self, mode: ChatMode, request: &ChatRequest) -> Result<EventStream> {
        let url = self.config.url_for(mode, request)?;
        tracing::info!(%mode, %url, "Opening chat stream");

        let response = self.http_client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Chat stream request rejected");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_sse_stream(response.bytes_stream()))
    }
}

/// Plays back a recorded event-stream body.
///
/// The body is split into the given chunks so line-buffering across reads
/// behaves exactly as it would over the network.
#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    chunks: Vec<Bytes>,
}

impl ReplayTransport {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }

    /// Whole body as one chunk
    pub fn from_body(body: impl Into<Bytes>) -> Self {
        Self::new([body.into()])
    }

    /// Body split into pieces of at most `size` bytes
    pub fn chunked(body: &[u8], size: usize) -> Self {
        Self::new(body.chunks(size.max(1)).map(Bytes::copy_from_slice))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let body = tokio::fs::read(path).await?;
        Ok(Self::from_body(body))
    }
}

#[async_trait]
impl ChatTransport for ReplayTransport {
    async fn open_stream(&self, mode: ChatMode, _request: &ChatRequest) -> Result<EventStream> {
        tracing::debug!(%mode, chunks = self.chunks.len(), "Replaying recorded chat stream");
        let chunks: Vec<std::result::Result<Bytes, std::convert::Infallible>> =
            self.chunks.iter().cloned().map(Ok).collect();
        Ok(decode_sse_stream(futures::stream::iter(chunks)))
    }
}
