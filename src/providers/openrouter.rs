//! OpenRouter aggregator adapter
//!
//! Free-tier provider speaking the OpenAI `/chat/completions` wire
//! format. This is the only adapter that supports streaming and the only
//! one whose credentials come from the rotation pool.

use super::{Completion, Provider, ProviderError, TokenStream};
use crate::config::Settings;
use crate::models::chat::ChatMessage;
use crate::models::openrouter::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, UpstreamErrorResponse,
    WireMessage,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::Client;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, error, warn};

/// OpenRouter provider
pub struct OpenRouterProvider {
    client: Client,
    stream_client: Client,
    base_url: String,
    site_url: String,
    site_name: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenRouterProvider {
    /// Create a new OpenRouter provider from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.openrouter.timeout))
            .user_agent("chatgateway/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        let stream_client = Client::builder()
            .timeout(Duration::from_secs(settings.openrouter.stream_timeout))
            .user_agent("chatgateway/0.1.0")
            .build()
            .context("Failed to create streaming HTTP client")?;

        Ok(Self {
            client,
            stream_client,
            base_url: settings.openrouter.base_url.clone(),
            site_url: settings.openrouter.site_url.clone(),
            site_name: settings.openrouter.site_name.clone(),
            temperature: settings.gateway.temperature,
            max_tokens: settings.gateway.max_tokens,
        })
    }

    /// Build the request URL
    fn build_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Shape the wire request: messages pass through as-is with the
    /// fixed sampling temperature and response length cap
    fn build_request(&self, messages: &[ChatMessage], model: &str, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: model.to_string(),
            messages: messages
                .iter()
                .map(|msg| WireMessage {
                    role: msg.role.as_str().to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            stream: stream.then_some(true),
        }
    }

    /// Attach Bearer auth and OpenRouter attribution headers
    fn add_headers(&self, builder: reqwest::RequestBuilder, credential: &str) -> reqwest::RequestBuilder {
        builder
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", &self.site_url)
            .header("X-Title", &self.site_name)
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        credential: &str,
    ) -> Result<Completion, ProviderError> {
        debug!("Sending OpenRouter chat completion request for model: {}", model);

        let request = self.build_request(messages, model, false);

        let response = self
            .add_headers(self.client.post(self.build_url()), credential)
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();

        if status.is_success() {
            let completion: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            debug!("OpenRouter request completed successfully");
            Ok(Completion { message: completion.message_text(), usage: completion.usage })
        } else {
            let body = response.text().await.unwrap_or_default();

            if let Ok(upstream) = serde_json::from_str::<UpstreamErrorResponse>(&body) {
                error!("OpenRouter API error: {}", upstream.error.message);
            } else {
                error!("OpenRouter API request failed: {} - {}", status, body);
            }

            Err(ProviderError::Http { status: status.as_u16(), body })
        }
    }

    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        model: &str,
        credential: &str,
    ) -> Result<TokenStream, ProviderError> {
        debug!("Sending OpenRouter streaming chat completion request for model: {}", model);

        let request = self.build_request(messages, model, true);

        let response = self
            .add_headers(self.stream_client.post(self.build_url()), credential)
            .header("Accept", "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("OpenRouter streaming request failed: {} - {}", status, body);
            return Err(ProviderError::Http { status: status.as_u16(), body });
        }

        let deltas = sse_data_lines(response.bytes_stream()).filter_map(|line_result| async move {
            match line_result {
                Ok(line) => {
                    let data = line.strip_prefix("data: ")?;
                    if data.trim() == "[DONE]" {
                        debug!("Received streaming response end marker");
                        return None;
                    }
                    match serde_json::from_str::<ChatCompletionChunk>(data) {
                        Ok(chunk) => chunk.delta_text().map(|delta| Ok(delta.to_string())),
                        Err(e) => {
                            warn!("Failed to parse streaming response chunk: {}", e);
                            None
                        }
                    }
                }
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(deltas))
    }
}

/// Split an upstream byte stream into complete lines, carrying partial
/// lines across chunk boundaries
fn sse_data_lines<S>(stream: S) -> impl futures::Stream<Item = Result<String, ProviderError>> + Send
where
    S: futures::Stream<Item = reqwest::Result<Bytes>> + Send + Unpin + 'static,
{
    futures::stream::unfold(
        (stream, String::new(), VecDeque::new()),
        |(mut upstream, mut buffer, mut pending)| async move {
            loop {
                if let Some(line) = pending.pop_front() {
                    return Some((Ok(line), (upstream, buffer, pending)));
                }

                match upstream.next().await {
                    Some(Ok(bytes)) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim_end_matches('\r').to_string();
                            buffer.drain(..=pos);
                            if !line.is_empty() {
                                pending.push_back(line);
                            }
                        }
                    }
                    Some(Err(e)) => {
                        return Some((
                            Err(ProviderError::from_transport(e)),
                            (upstream, buffer, pending),
                        ));
                    }
                    None => {
                        if buffer.is_empty() {
                            return None;
                        }
                        let trailing = std::mem::take(&mut buffer);
                        let trailing = trailing.trim_end_matches('\r').to_string();
                        if !trailing.is_empty() {
                            pending.push_back(trailing);
                        }
                    }
                }
            }
        },
    )
}
