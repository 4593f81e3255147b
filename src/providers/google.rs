//! Google Gemini native BYOK adapter
//!
//! The generateContent API has no system role: the system instruction is
//! folded into the start of the first user turn, and the `assistant`
//! role is translated to Gemini's `model` role. Non-streaming only.

use super::{native_model_name, Completion, Provider, ProviderError, Vendor};
use crate::config::Settings;
use crate::models::chat::{ChatMessage, Role, TokenUsage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini generateContent request
#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Gemini generateContent response
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}

/// Google Gemini native provider
pub struct GoogleProvider {
    client: Client,
    base_url: String,
    temperature: f32,
    max_tokens: u32,
}

impl GoogleProvider {
    /// Create a new Google provider from settings
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.openrouter.timeout))
            .user_agent("chatgateway/0.1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: GOOGLE_BASE_URL.to_string(),
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

    fn build_url(&self, native_model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            native_model
        )
    }

    /// Fold the system instruction into the first user turn and rename
    /// `assistant` to `model`
    fn build_contents(&self, messages: &[ChatMessage]) -> Vec<GeminiContent> {
        let system_text = messages
            .iter()
            .find(|msg| msg.role == Role::System)
            .map(|msg| msg.content.clone());

        let mut contents = Vec::new();
        let mut system_pending = system_text;

        for msg in messages.iter().filter(|msg| msg.role != Role::System) {
            let role = match msg.role {
                Role::Assistant => "model",
                _ => "user",
            };

            let text = if role == "user" && system_pending.is_some() {
                let system = system_pending.take().unwrap_or_default();
                format!("{}\n\n{}", system, msg.content)
            } else {
                msg.content.clone()
            };

            contents.push(GeminiContent { role: role.to_string(), parts: vec![GeminiPart { text }] });
        }

        contents
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        model: &str,
        credential: &str,
    ) -> Result<Completion, ProviderError> {
        let native_model = native_model_name(model, Vendor::Google);
        debug!("Sending Gemini generateContent request for model: {}", native_model);

        let request = GenerateContentRequest {
            contents: self.build_contents(messages),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.build_url(native_model))
            .query(&[("key", credential)])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();

        if status.is_success() {
            let completion: GenerateContentResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            let message = completion
                .candidates
                .first()
                .and_then(|candidate| candidate.content.as_ref())
                .map(|content| {
                    content
                        .parts
                        .iter()
                        .map(|part| part.text.as_str())
                        .collect::<Vec<_>>()
                        .join("")
                })
                .unwrap_or_default();

            let usage = completion.usage_metadata.map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            });

            debug!("Gemini request completed successfully");
            Ok(Completion { message, usage })
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API request failed: {} - {}", status, body);
            Err(ProviderError::Http { status: status.as_u16(), body })
        }
    }
}
