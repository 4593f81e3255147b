//! Anthropic native BYOK adapter
//!
//! The Messages API takes the system instruction as a dedicated top-level
//! field, so the first system-role message is hoisted out of the turn
//! array before sending. Non-streaming only.

use super::{native_model_name, Completion, Provider, ProviderError, Vendor};
use crate::config::Settings;
use crate::models::chat::{ChatMessage, Role, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<MessagesTurn>,
}

#[derive(Debug, Serialize)]
struct MessagesTurn {
    role: String,
    content: String,
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<MessagesContent>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct MessagesContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic native provider
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.openrouter.timeout))
            .user_agent("chatgateway/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            temperature: settings.gateway.temperature,
            max_tokens: settings.gateway.max_tokens,
        })
    }

    /// Override the upstream base URL (tests)
    #[doc(hidden)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_url(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    /// Hoist the first system message into the dedicated field and keep
    /// only non-system messages in the turn array
    fn build_request(&self, messages: &[ChatMessage], model: &str) -> MessagesRequest {
        let system = messages
            .iter()
            .find(|msg| msg.role == Role::System)
            .map(|msg| msg.content.clone());

        let turns = messages
            .iter()
            .filter(|msg| msg.role != Role::System)
            .map(|msg| MessagesTurn {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            })
            .collect();

        MessagesRequest {
            model: native_model_name(model, Vendor::Anthropic).to_string(),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            system,
            messages: turns,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        credential: &str,
    ) -> Result<Completion, ProviderError> {
        let request = self.build_request(messages, model);
        debug!("Sending Anthropic messages request for model: {}", request.model);

        let response = self
            .client
            .post(self.build_url())
            .header("x-api-key", credential)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();

        if status.is_success() {
            let completion: MessagesResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            let message = completion
                .content
                .iter()
                .filter(|block| block.content_type == "text")
                .filter_map(|block| block.text.as_deref())
                .collect::<Vec<_>>()
                .join("");

            let usage = completion.usage.map(|u| TokenUsage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            });

            debug!("Anthropic request completed successfully");
            Ok(Completion { message, usage })
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Anthropic API request failed: {} - {}", status, body);
            Err(ProviderError::Http { status: status.as_u16(), body })
        }
    }
}
