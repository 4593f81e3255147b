//! OpenAI-shaped wire models
//!
//! Request and response structures shared by the aggregator (OpenRouter)
//! and the native OpenAI adapter, both of which speak the
//! `/chat/completions` wire format

use serde::{Deserialize, Serialize};

use super::chat::TokenUsage;

/// Chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model name
    pub model: String,
    /// Message list
    pub messages: Vec<WireMessage>,
    /// Maximum tokens to generate (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Temperature parameter (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Whether to stream the response (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// Message as sent on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    /// Role (system/user/assistant)
    pub role: String,
    /// Message content
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Response ID
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Choice list
    pub choices: Vec<CompletionChoice>,
    /// Usage statistics (optional on some aggregator responses)
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Completion choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionChoice {
    /// Choice index
    pub index: u32,
    /// Message content
    pub message: WireMessage,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Streaming response chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Response ID
    pub id: String,
    /// Model used
    #[serde(default)]
    pub model: String,
    /// Choice list
    pub choices: Vec<StreamChoice>,
}

/// Streaming choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
    /// Choice index
    pub index: u32,
    /// Delta content
    pub delta: StreamDelta,
    /// Finish reason
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Streaming delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDelta {
    /// Role (optional, first chunk only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content fragment (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Extract the incremental text delta from the first choice
    pub fn delta_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
    }
}

impl ChatCompletionResponse {
    /// Extract the assistant message text from the first choice
    pub fn message_text(&self) -> String {
        self.choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}

/// Upstream error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamErrorResponse {
    /// Error information
    pub error: UpstreamError,
}

/// Upstream error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamError {
    /// Error message
    pub message: String,
    /// Error type (optional)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Error code (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "google/gemma-3-27b-it:free".to_string(),
            messages: vec![WireMessage { role: "user".to_string(), content: "Hello".to_string() }],
            max_tokens: Some(1000),
            temperature: Some(0.7),
            stream: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "google/gemma-3-27b-it:free");
        assert_eq!(json["max_tokens"], 1000);
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_chunk_delta_extraction() {
        let chunk: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"gen-1","model":"m","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.delta_text(), Some("Hel"));

        let role_only: ChatCompletionChunk = serde_json::from_str(
            r#"{"id":"gen-1","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#,
        )
        .unwrap();
        assert_eq!(role_only.delta_text(), None);
    }

    #[test]
    fn test_response_without_usage() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"gen-2","choices":[{"index":0,"message":{"role":"assistant","content":"Hi"}}]}"#,
        )
        .unwrap();
        assert_eq!(response.message_text(), "Hi");
        assert!(response.usage.is_none());
    }
}
