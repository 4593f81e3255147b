//! OpenAI native BYOK adapter
//!
//! Speaks the same `/chat/completions` wire format as the aggregator but
//! against api.openai.com with a caller-supplied key. Non-streaming only.

use super::{native_model_name, Completion, Provider, ProviderError, Vendor};
use crate::config::Settings;
use crate::models::chat::ChatMessage;
use crate::models::openrouter::{ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI native provider
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.openrouter.timeout))
            .user_agent("chatgateway/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: OPENAI_BASE_URL.to_string(),
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
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        credential: &str,
    ) -> Result<Completion, ProviderError> {
        let native_model = native_model_name(model, Vendor::OpenAi);
        debug!("Sending OpenAI chat completion request for model: {}", native_model);

        let request = ChatCompletionRequest {
            model: native_model.to_string(),
            messages: messages
                .iter()
                .map(|msg| WireMessage {
                    role: msg.role.as_str().to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            stream: None,
        };

        let response = self
            .client
            .post(self.build_url())
            .header("Authorization", format!("Bearer {}", credential))
            .header("Content-Type", "application/json")
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

            debug!("OpenAI request completed successfully");
            Ok(Completion { message: completion.message_text(), usage: completion.usage })
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("OpenAI API request failed: {} - {}", status, body);
            Err(ProviderError::Http { status: status.as_u16(), body })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GatewayConfig, LoggingConfig, OpenRouterConfig, ServerConfig};

    fn test_settings() -> Settings {
        Settings {
            server: ServerConfig { host: "localhost".to_string(), port: 8080 },
            openrouter: OpenRouterConfig {
                base_url: "https://openrouter.ai/api/v1".to_string(),
                site_url: "http://localhost:3000".to_string(),
                site_name: "chatgateway".to_string(),
                default_model: "google/gemini-2.0-flash-exp:free".to_string(),
                api_keys: vec![],
                timeout: 30,
                stream_timeout: 300,
            },
            gateway: GatewayConfig { max_retries: 5, temperature: 0.7, max_tokens: 1000 },
            logging: LoggingConfig { level: "info".to_string(), format: "text".to_string() },
        }
    }

    #[test]
    fn test_provider_creation() {
        assert!(OpenAiProvider::new(&test_settings()).is_ok());
    }

    #[test]
    fn test_build_url() {
        let provider = OpenAiProvider::new(&test_settings()).unwrap();
        assert_eq!(provider.build_url(), "https://api.openai.com/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_streaming_unsupported() {
        let provider = OpenAiProvider::new(&test_settings()).unwrap();
        let result = provider
            .complete_stream(&[ChatMessage::user("Hi")], "openai/gpt-4o:byok", "sk-key")
            .await;
        assert!(matches!(result, Err(ProviderError::StreamingUnsupported)));
    }
}
