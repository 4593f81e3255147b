//! Client-side stream consumer
//!
//! Reads the gateway's SSE wire protocol back into typed frames. Used by
//! in-process callers (title generation waits on a completion the same
//! way a browser would) and exposed for integration tests.
//!
//! The reader is pull-based: each `next_frame` call drains buffered
//! frames first and only then awaits more bytes, so frames are never
//! dropped when a single network read carries several events.

use crate::models::wire::{StreamFrame, SSE_DATA_PREFIX};
use crate::models::ChatMessage;
use crate::utils::error::{AppError, AppResult, ErrorBody};
use anyhow::{Context, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Boxed byte stream, as produced by `reqwest::Response::bytes_stream`
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static>>;

/// Incremental SSE frame reader over a byte stream
///
/// Buffers partial lines across read boundaries, parses `data: ` events
/// into [`StreamFrame`]s, and stops after the first terminal frame.
/// Lines that fail to parse are logged and skipped rather than aborting
/// the stream.
pub struct StreamChunkReader {
    inner: ByteStream,
    buffer: String,
    pending: VecDeque<StreamFrame>,
    finished: bool,
}

impl StreamChunkReader {
    /// Wrap a raw byte stream
    pub fn new(inner: ByteStream) -> Self {
        Self { inner, buffer: String::new(), pending: VecDeque::new(), finished: false }
    }

    /// A reader that yields exactly one terminal error frame
    ///
    /// Used when the request failed before any SSE bytes arrived.
    pub fn from_error(message: impl Into<String>) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(StreamFrame::error(message));
        Self {
            inner: Box::pin(futures::stream::empty()),
            buffer: String::new(),
            pending,
            finished: false,
        }
    }

    /// Get the next frame, or `None` when the stream is exhausted
    ///
    /// Returns `None` after the first terminal frame even if the server
    /// keeps sending; everything past `done: true` is ignored.
    pub async fn next_frame(&mut self) -> Option<StreamFrame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                if frame.is_terminal() {
                    self.finished = true;
                    self.pending.clear();
                }
                return Some(frame);
            }

            if self.finished {
                return None;
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    self.drain_complete_lines();
                }
                Some(Err(e)) => {
                    warn!("Stream transport error: {}", e);
                    self.pending.push_back(StreamFrame::error(format!("Stream error: {}", e)));
                }
                None => {
                    // Flush whatever remains as a final line
                    if !self.buffer.is_empty() {
                        let line = std::mem::take(&mut self.buffer);
                        self.parse_line(&line);
                    }
                    if self.pending.is_empty() {
                        return None;
                    }
                }
            }
        }
    }

    /// Split off every complete line in the buffer, keeping the trailing
    /// partial line for the next read
    fn drain_complete_lines(&mut self) {
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            self.parse_line(&line);
        }
    }

    fn parse_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let Some(payload) = line.strip_prefix(SSE_DATA_PREFIX) else {
            return;
        };

        match serde_json::from_str::<StreamFrame>(payload) {
            Ok(frame) => self.pending.push_back(frame),
            Err(e) => {
                warn!("Skipping unparseable stream line: {} ({})", payload, e);
            }
        }
    }
}

/// Request body sent to the streaming endpoint
#[derive(Debug, Serialize)]
struct StreamRequestBody<'a> {
    messages: &'a [ChatMessage],
    #[serde(rename = "modelId")]
    model_id: &'a str,
}

/// HTTP client for the gateway's streaming chat endpoint
pub struct ChatStreamClient {
    client: Client,
    base_url: String,
}

impl ChatStreamClient {
    /// Create a client for the given gateway base URL
    pub fn new(base_url: impl Into<String>, stream_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(stream_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url: base_url.into() })
    }

    fn build_url(&self) -> String {
        format!("{}/api/chat/stream", self.base_url.trim_end_matches('/'))
    }

    /// Start a streaming chat completion and return a frame reader
    ///
    /// A non-OK response is not an `Err`: the body is read, the
    /// `{ "error": ... }` shape is tried first and the raw text used as
    /// a fallback, and the result surfaces as a single terminal error
    /// frame. `Err` is reserved for failures building the request.
    pub async fn stream_chat_completion(
        &self,
        messages: &[ChatMessage],
        model_id: &str,
    ) -> AppResult<StreamChunkReader> {
        let body = StreamRequestBody { messages, model_id };

        let response = self
            .client
            .post(self.build_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send stream request: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    if text.is_empty() {
                        format!("Request failed with status {}", status.as_u16())
                    } else {
                        text
                    }
                });
            debug!("Stream request rejected: {} - {}", status, message);
            return Ok(StreamChunkReader::from_error(message));
        }

        Ok(StreamChunkReader::new(Box::pin(response.bytes_stream())))
    }
}

/// Drive a streaming completion through callbacks
///
/// `on_chunk` fires once per chunk frame with the delta text. Exactly
/// one of `on_complete` / `on_error` fires: `on_complete` with the final
/// message on a done frame, `on_error` on an error frame or when the
/// stream ends without any terminal frame.
pub async fn create_streaming_chat_completion<C, D, E>(
    client: &ChatStreamClient,
    messages: &[ChatMessage],
    model_id: &str,
    mut on_chunk: C,
    on_complete: D,
    on_error: E,
) -> AppResult<()>
where
    C: FnMut(&str, &str),
    D: FnOnce(String),
    E: FnOnce(String),
{
    let mut reader = client.stream_chat_completion(messages, model_id).await?;

    while let Some(frame) = reader.next_frame().await {
        match frame {
            StreamFrame::Chunk { content, full_message, .. } => {
                on_chunk(&content, &full_message);
            }
            StreamFrame::Done { full_message, .. } => {
                on_complete(full_message);
                return Ok(());
            }
            StreamFrame::Error { error, .. } => {
                on_error(error);
                return Ok(());
            }
        }
    }

    on_error("Unknown error occurred.".to_string());
    Ok(())
}
